//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::cookies::{read_cookie, SESSION_COOKIE};
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Accepts the `session` cookie set by the OAuth callback, or the same token
/// as `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string());

        let token = match bearer.or_else(|| read_cookie(&parts.headers, SESSION_COOKIE)) {
            Some(t) if !t.is_empty() => t,
            _ => {
                debug!("Authentication failed: no session");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        let account = app_state.sessions.authenticate(&token).await.map_err(|e| {
            warn!(error = %e, "Session rejected");
            ApiError::from(e)
        })?;

        debug!(
            user_id = %account.id,
            email = %safe_email_log(&account.email),
            "User authentication successful via extractor"
        );

        Ok(AuthedUser {
            id: account.id,
            email: account.email,
            name: account.name,
        })
    }
}
