//! Session establishment
//!
//! Sessions are HS256 tokens carried in the `session` cookie (or a Bearer
//! header). Persistent sessions embed the account's remember token, which is
//! rotated on every persistent login and cleared on logout, so every
//! persistent session for an account can be revoked at once.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{Account, Claims};
use super::store::{AccountStore, StoreError};
use crate::common::config::SessionLifetimes;
use crate::common::{random_token, ApiError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token")]
    InvalidToken,

    #[error("session revoked")]
    Revoked,

    #[error("account no longer exists")]
    UnknownAccount,

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidToken | SessionError::Revoked | SessionError::UnknownAccount => {
                ApiError::Unauthorized(e.to_string())
            }
            SessionError::Encoding(msg) => ApiError::InternalServer(msg),
            SessionError::Store(e) => e.into(),
        }
    }
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub persistent: bool,
}

impl SessionGrant {
    /// Cookie lifetime: persistent sessions outlive the browser session
    pub fn cookie_max_age(&self) -> Option<i64> {
        self.persistent
            .then(|| (self.expires_at - Utc::now()).num_seconds().max(0))
    }
}

/// Makes an account the authenticated principal of the caller
#[async_trait]
pub trait SessionEstablisher: Send + Sync {
    async fn start_session(
        &self,
        account: &Account,
        persistent: bool,
    ) -> Result<SessionGrant, SessionError>;
}

pub struct JwtSessions {
    store: Arc<dyn AccountStore>,
    secret: String,
    lifetimes: SessionLifetimes,
}

impl JwtSessions {
    pub fn new(store: Arc<dyn AccountStore>, secret: String, lifetimes: SessionLifetimes) -> Self {
        Self {
            store,
            secret,
            lifetimes,
        }
    }

    fn issue(&self, claims: &Claims) -> Result<String, SessionError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SessionError::Encoding(e.to_string()))
    }

    pub fn decode_claims(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Session token validation failed");
            SessionError::InvalidToken
        })
    }

    /// Validate a session token and load its account
    pub async fn authenticate(&self, token: &str) -> Result<Account, SessionError> {
        let claims = self.decode_claims(token)?;

        let account = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or(SessionError::UnknownAccount)?;

        if let Some(remember) = &claims.rmb {
            if account.remember_token.as_deref() != Some(remember.as_str()) {
                warn!(user_id = %account.id, "Persistent session presented a stale remember token");
                return Err(SessionError::Revoked);
            }
        }

        Ok(account)
    }

    /// Revoke persistent sessions for the account
    pub async fn end_sessions(&self, account_id: &str) -> Result<(), SessionError> {
        self.store.set_remember_token(account_id, None).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionEstablisher for JwtSessions {
    async fn start_session(
        &self,
        account: &Account,
        persistent: bool,
    ) -> Result<SessionGrant, SessionError> {
        let (expires_at, rmb) = if persistent {
            let token = random_token(30);
            self.store.set_remember_token(&account.id, Some(&token)).await?;
            (
                Utc::now() + Duration::days(self.lifetimes.remember_days),
                Some(token),
            )
        } else {
            (
                Utc::now() + Duration::minutes(self.lifetimes.session_minutes),
                None,
            )
        };

        let claims = Claims {
            sub: account.id.clone(),
            exp: expires_at.timestamp() as usize,
            rmb,
        };

        Ok(SessionGrant {
            token: self.issue(&claims)?,
            expires_at,
            persistent,
        })
    }
}
