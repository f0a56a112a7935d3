//! Authentication handlers

use axum::{
    extract::{Extension, Json, Path, Query},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::callback::{
    complete_login, sanitize_intended, CallbackContext, CallbackOutcome, LOGIN_PATH,
};
use super::cookies::{
    clear_cookie, read_cookie, set_cookie, INTENDED_COOKIE, OAUTH_STATE_COOKIE, SESSION_COOKIE,
};
use super::extractors::AuthedUser;
use super::models::{CallbackParams, LoginParams, Provider, RedirectParams};
use super::resolver::AccountResolver;
use crate::common::{random_token, ApiError, AppState};
use crate::podcasts::services::PodcastsService;

/// The OAuth state cookie only has to survive the consent screen
const OAUTH_COOKIE_MAX_AGE: i64 = 10 * 60;

fn supported_provider(name: &str) -> Result<Provider, ApiError> {
    name.parse::<Provider>()
        .map_err(|_| ApiError::NotFound(format!("Unknown provider '{}'", name)))
}

/// GET /auth/:provider/redirect
/// Sends the browser to the provider's consent screen
pub async fn oauth_redirect(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider): Path<String>,
    Query(params): Query<RedirectParams>,
) -> Result<Response, ApiError> {
    let provider = supported_provider(&provider)?;
    let state = state_lock.read().await.clone();

    let client = state
        .providers
        .get(provider)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown provider '{}'", provider)))?;

    let csrf_state = random_token(24);
    let auth_url = client.authorization_url(&csrf_state).map_err(|e| {
        error!(error = %e, provider = %provider, "Failed to generate OAuth URL");
        ApiError::ServiceUnavailable(format!("{} login is not available", provider))
    })?;

    info!(provider = %provider, "Redirecting to OAuth consent screen");

    let secure = state.secure_cookies();
    let mut response = Redirect::to(&auth_url).into_response();
    let headers = response.headers_mut();
    headers.append(
        SET_COOKIE,
        set_cookie(OAUTH_STATE_COOKIE, &csrf_state, Some(OAUTH_COOKIE_MAX_AGE), secure),
    );
    if let Some(intended) = params.intended.as_deref().and_then(sanitize_intended) {
        headers.append(
            SET_COOKIE,
            set_cookie(
                INTENDED_COOKIE,
                &urlencoding::encode(intended),
                Some(OAUTH_COOKIE_MAX_AGE),
                secure,
            ),
        );
    }

    Ok(response)
}

/// GET /auth/:provider/callback
/// Logs the user in (registering or linking the account as needed)
pub async fn oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let provider = supported_provider(&provider)?;
    let state = state_lock.read().await.clone();

    let client = state
        .providers
        .get(provider)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown provider '{}'", provider)))?;

    let expected_state = read_cookie(&headers, OAUTH_STATE_COOKIE);
    let intended = read_cookie(&headers, INTENDED_COOKIE)
        .and_then(|raw| urlencoding::decode(&raw).ok().map(|v| v.into_owned()));

    let resolver = AccountResolver::new(state.accounts.clone());
    let outcome = complete_login(
        CallbackContext {
            provider,
            params: &params,
            expected_state: expected_state.as_deref(),
            intended: intended.as_deref(),
        },
        client.as_ref(),
        &resolver,
        state.sessions.as_ref(),
    )
    .await?;

    let secure = state.secure_cookies();
    let response = match outcome {
        CallbackOutcome::Authenticated {
            account,
            grant,
            destination,
        } => {
            info!(
                user_id = %account.id,
                provider = %provider,
                destination = %destination,
                "Login complete, redirecting"
            );
            let mut response = Redirect::to(&destination).into_response();
            let headers = response.headers_mut();
            headers.append(
                SET_COOKIE,
                set_cookie(SESSION_COOKIE, &grant.token, grant.cookie_max_age(), secure),
            );
            headers.append(SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE, secure));
            headers.append(SET_COOKIE, clear_cookie(INTENDED_COOKIE, secure));
            response
        }
        CallbackOutcome::Failed { status } => {
            let location = format!("{}?status={}", LOGIN_PATH, urlencoding::encode(&status));
            let mut response = Redirect::to(&location).into_response();
            response
                .headers_mut()
                .append(SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE, secure));
            response
        }
    };

    Ok(response)
}

/// GET /login
/// Login entry point: status message from a failed attempt plus provider links
pub async fn login_page(Query(params): Query<LoginParams>) -> Json<serde_json::Value> {
    let providers: Vec<serde_json::Value> = Provider::ALL
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.as_str(),
                "redirect_url": format!("/auth/{}/redirect", p),
            })
        })
        .collect();

    Json(serde_json::json!({
        "status": params.status,
        "providers": providers,
    }))
}

/// GET /dashboard
pub async fn dashboard(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();
    let podcasts = PodcastsService::new(state.db.clone())
        .count_for_owner(&authed.id)
        .await?;

    Ok(Json(serde_json::json!({
        "user": {
            "id": authed.id,
            "name": authed.name,
            "email": authed.email,
        },
        "podcast_count": podcasts,
    })))
}

/// GET /api/me
/// Returns the current authenticated user's information
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = state
        .accounts
        .find_by_id(&authed.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user not found".to_string()))?;

    Ok(Json(serde_json::json!({ "user": user })))
}

/// POST /logout
/// Revokes persistent sessions and expires the session cookie
pub async fn logout_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();
    state.sessions.end_sessions(&authed.id).await?;

    info!(user_id = %authed.id, "User logout successful");

    let mut response = Json(serde_json::json!({ "message": "Logout successful" })).into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, clear_cookie(SESSION_COOKIE, state.secure_cookies()));
    Ok(response)
}
