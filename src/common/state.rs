// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::provider::{GoogleIdentityProvider, IdentityProvider, ProviderRegistry};
use crate::auth::session::JwtSessions;
use crate::auth::store::{AccountStore, SqliteAccountStore};
use crate::common::config::AppConfig;
use crate::podcasts::storage::SourceStorage;

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub accounts: Arc<dyn AccountStore>,
    pub providers: ProviderRegistry,
    pub sessions: Arc<JwtSessions>,
    pub storage: Arc<SourceStorage>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let accounts: Arc<dyn AccountStore> = Arc::new(SqliteAccountStore::new(db.clone()));
        let sessions = Arc::new(JwtSessions::new(
            accounts.clone(),
            config.session_secret.clone(),
            config.session_lifetimes,
        ));
        let providers = ProviderRegistry::new()
            .register(Arc::new(GoogleIdentityProvider::new(config.google.clone())));
        let storage = Arc::new(SourceStorage::new(config.uploads_dir.clone()));

        Self {
            db,
            config: Arc::new(config),
            accounts,
            providers,
            sessions,
            storage,
        }
    }

    /// Replace the client serving a provider
    pub fn with_provider(mut self, client: Arc<dyn IdentityProvider>) -> Self {
        self.providers = self.providers.register(client);
        self
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.app_url.starts_with("https://")
    }
}
