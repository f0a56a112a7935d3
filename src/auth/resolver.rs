//! Account resolution for social login
//!
//! Decides which local account a provider profile authenticates as:
//!
//! 1. an account already linked to `(provider, profile.id)`,
//! 2. otherwise, when the profile carries an email, the account with that email,
//! 3. otherwise a freshly created account.
//!
//! The chosen account always gets its provider linkage and avatar refreshed.
//! Name and email of an existing account are never touched.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{Account, NormalizedProfile, Provider};
use super::store::{AccountStore, StoreError};
use crate::common::{generate_user_id, random_token, safe_email_log, ApiError};

/// Domain used for synthesized addresses when a provider returns no email
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "example.local";

pub const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("credential generation failed: {0}")]
    Credential(String),
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Store(e) => e.into(),
            ResolveError::Credential(msg) => {
                error!(error = %msg, "Could not generate account credential");
                ApiError::InternalServer("Account could not be created".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    LinkedByProvider,
    LinkedByEmail,
    Created,
}

pub struct AccountResolver {
    store: Arc<dyn AccountStore>,
}

impl AccountResolver {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Resolve, link and persist the account for a provider profile
    pub async fn resolve(
        &self,
        provider: Provider,
        profile: &NormalizedProfile,
    ) -> Result<(Account, Resolution), ResolveError> {
        let (account, resolution) = match self.find_existing(provider, profile).await? {
            Some(found) => found,
            None => (new_account(profile)?, Resolution::Created),
        };

        let account = link(account, provider, profile);
        match self.store.save(&account).await {
            Ok(()) => {}
            // Lost a creation race: somebody else inserted this identity or
            // email between our lookup and our insert. Look it up once more.
            Err(StoreError::Conflict(msg)) if resolution == Resolution::Created => {
                warn!(
                    provider = %provider,
                    provider_id = %profile.id,
                    error = %msg,
                    "Account creation conflicted, retrying as lookup"
                );
                let (existing, resolution) = self
                    .find_existing(provider, profile)
                    .await?
                    .ok_or(StoreError::Conflict(msg))?;
                let account = link(existing, provider, profile);
                self.store.save(&account).await?;
                let account = self
                    .store
                    .find_by_id(&account.id)
                    .await?
                    .unwrap_or(account);
                return Ok((account, resolution));
            }
            Err(e) => return Err(e.into()),
        }

        // Fetch back so store-assigned timestamps are populated
        let account = self
            .store
            .find_by_id(&account.id)
            .await?
            .unwrap_or(account);

        match resolution {
            Resolution::Created => info!(
                user_id = %account.id,
                email = %safe_email_log(&account.email),
                provider = %provider,
                "Created account via social login"
            ),
            _ => debug!(
                user_id = %account.id,
                provider = %provider,
                resolution = ?resolution,
                "Linked existing account"
            ),
        }

        Ok((account, resolution))
    }

    async fn find_existing(
        &self,
        provider: Provider,
        profile: &NormalizedProfile,
    ) -> Result<Option<(Account, Resolution)>, StoreError> {
        if let Some(account) = self
            .store
            .find_by_provider_identity(provider.as_str(), &profile.id)
            .await?
        {
            return Ok(Some((account, Resolution::LinkedByProvider)));
        }

        match non_empty(&profile.email) {
            Some(email) => Ok(self
                .store
                .find_by_email(email)
                .await?
                .map(|account| (account, Resolution::LinkedByEmail))),
            None => Ok(None),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Name fallback chain: profile name, then nickname, then "User"
pub fn display_name(profile: &NormalizedProfile) -> String {
    non_empty(&profile.name)
        .or_else(|| non_empty(&profile.nickname))
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .to_string()
}

pub fn placeholder_email() -> String {
    format!("{}@{}", Uuid::new_v4(), PLACEHOLDER_EMAIL_DOMAIN)
}

fn new_account(profile: &NormalizedProfile) -> Result<Account, ResolveError> {
    let email = non_empty(&profile.email)
        .map(str::to_string)
        .unwrap_or_else(placeholder_email);

    Ok(Account {
        id: generate_user_id(),
        name: display_name(profile),
        email,
        password: unusable_password_hash()?,
        provider: None,
        provider_id: None,
        avatar: None,
        email_verified_at: Some(Utc::now().to_rfc3339()),
        remember_token: None,
        created_at: None,
        updated_at: None,
    })
}

fn link(mut account: Account, provider: Provider, profile: &NormalizedProfile) -> Account {
    account.provider = Some(provider.as_str().to_string());
    account.provider_id = Some(profile.id.clone());
    account.avatar = profile.avatar_url.clone();
    account
}

/// Argon2 hash of a random secret nobody ever sees
fn unusable_password_hash() -> Result<String, ResolveError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ResolveError::Credential(e.to_string()))?;

    Argon2::default()
        .hash_password(random_token(32).as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ResolveError::Credential(e.to_string()))
}
