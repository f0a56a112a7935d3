//! OAuth callback orchestration
//!
//! Provider failures of any kind (denied consent, bad state, network,
//! malformed responses) end in `CallbackOutcome::Failed` and never touch an
//! account. Persistence failures propagate as errors.

use tracing::{info, warn};

use super::models::{Account, CallbackParams, Provider};
use super::provider::{IdentityProvider, ProviderError};
use super::resolver::AccountResolver;
use super::session::{SessionEstablisher, SessionGrant};
use crate::common::{safe_email_log, ApiError};

pub const DEFAULT_DESTINATION: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug)]
pub enum CallbackOutcome {
    Authenticated {
        account: Account,
        grant: SessionGrant,
        destination: String,
    },
    Failed {
        status: String,
    },
}

pub fn failure_status(provider: Provider) -> String {
    format!("Unable to authenticate with {}. Please try again.", provider)
}

/// Accept only same-site absolute paths as post-login destinations
pub fn sanitize_intended(intended: &str) -> Option<&str> {
    let ok = intended.starts_with('/')
        && !intended.starts_with("//")
        && !intended.contains('\\')
        && !intended.chars().any(char::is_control);
    ok.then_some(intended)
}

pub struct CallbackContext<'a> {
    pub provider: Provider,
    pub params: &'a CallbackParams,
    pub expected_state: Option<&'a str>,
    pub intended: Option<&'a str>,
}

pub async fn complete_login(
    ctx: CallbackContext<'_>,
    client: &dyn IdentityProvider,
    resolver: &AccountResolver,
    sessions: &dyn SessionEstablisher,
) -> Result<CallbackOutcome, ApiError> {
    let provider = ctx.provider;

    let profile = match verify_state(&ctx) {
        Ok(()) => client.fetch_profile(ctx.params).await,
        Err(e) => Err(e),
    };

    let profile = match profile {
        Ok(profile) => profile,
        Err(e) => {
            warn!(provider = %provider, error = %e, "Social login failed: {}", e);
            return Ok(CallbackOutcome::Failed {
                status: failure_status(provider),
            });
        }
    };

    let (account, resolution) = resolver.resolve(provider, &profile).await?;

    // Social logins always ask for a persistent session
    let grant = sessions.start_session(&account, true).await?;

    info!(
        user_id = %account.id,
        email = %safe_email_log(&account.email),
        provider = %provider,
        resolution = ?resolution,
        "User authenticated via social login"
    );

    let destination = ctx
        .intended
        .and_then(sanitize_intended)
        .unwrap_or(DEFAULT_DESTINATION)
        .to_string();

    Ok(CallbackOutcome::Authenticated {
        account,
        grant,
        destination,
    })
}

fn verify_state(ctx: &CallbackContext<'_>) -> Result<(), ProviderError> {
    match (ctx.expected_state, ctx.params.state.as_deref()) {
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received => Ok(()),
        _ => Err(ProviderError::StateMismatch),
    }
}
