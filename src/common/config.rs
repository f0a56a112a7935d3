// src/common/config.rs
//! Runtime configuration loaded from the environment

use std::env;
use std::path::PathBuf;

/// Session lifetimes used when issuing session tokens
#[derive(Debug, Clone, Copy)]
pub struct SessionLifetimes {
    pub session_minutes: i64,
    pub remember_days: i64,
}

impl Default for SessionLifetimes {
    fn default() -> Self {
        Self {
            session_minutes: 120,
            remember_days: 30,
        }
    }
}

/// Google OAuth client credentials
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub app_url: String,
    pub session_secret: String,
    pub session_lifetimes: SessionLifetimes,
    pub google: Option<GoogleOAuthConfig>,
    pub uploads_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub reset_db: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let app_url = env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let google = match (
            env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            env::var("GOOGLE_CLIENT_SECRET").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(client_id), Some(client_secret)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|_| format!("{}/auth/google/callback", app_url)),
            }),
            _ => None,
        };

        let defaults = SessionLifetimes::default();
        let session_lifetimes = SessionLifetimes {
            session_minutes: parse_env("SESSION_LIFETIME_MINUTES", defaults.session_minutes),
            remember_days: parse_env("REMEMBER_LIFETIME_DAYS", defaults.remember_days),
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| {
                "http://localhost:3000,http://localhost:5173".to_string()
            })
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://podcast_api.db".to_string()),
            port: parse_env("PORT", 8080),
            app_url,
            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "replace_with_strong_secret".to_string()),
            session_lifetimes,
            google,
            uploads_dir: PathBuf::from(
                env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            ),
            cors_origins,
            reset_db: env::var("RESET_DB")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Directory where uploaded podcast source documents are written
    pub fn podcast_sources_dir(&self) -> PathBuf {
        self.uploads_dir.join("podcast_sources")
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
