// Shared fixtures for HTTP-level tests

use async_trait::async_trait;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use super::config::{AppConfig, SessionLifetimes};
use super::migrations::test_pool;
use super::{generate_raw_id, AppState};
use crate::auth::cookies::{INTENDED_COOKIE, OAUTH_STATE_COOKIE, SESSION_COOKIE};
use crate::auth::models::{CallbackParams, NormalizedProfile, Provider};
use crate::auth::provider::{IdentityProvider, ProviderError};

/// Identity provider whose next handshake result is scripted by the test
pub struct FakeProvider {
    outcome: Mutex<Result<NormalizedProfile, String>>,
}

impl FakeProvider {
    pub fn returning(profile: NormalizedProfile) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Ok(profile)),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Err(reason.to_string())),
        })
    }

    pub fn set_profile(&self, profile: NormalizedProfile) {
        *self.outcome.lock().unwrap() = Ok(profile);
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        Ok(format!("https://accounts.test/consent?state={}", state))
    }

    async fn fetch_profile(
        &self,
        params: &CallbackParams,
    ) -> Result<NormalizedProfile, ProviderError> {
        if let Some(error) = &params.error {
            return Err(ProviderError::Denied(error.clone()));
        }
        self.outcome
            .lock()
            .unwrap()
            .clone()
            .map_err(ProviderError::RequestFailed)
    }
}

pub fn google_profile(id: &str, email: Option<&str>, name: Option<&str>) -> NormalizedProfile {
    NormalizedProfile {
        id: id.to_string(),
        email: email.map(str::to_string),
        name: name.map(str::to_string),
        nickname: None,
        avatar_url: Some(format!("https://avatars.test/{}.png", id)),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        port: 0,
        app_url: "http://localhost".to_string(),
        session_secret: "test-session-secret".to_string(),
        session_lifetimes: SessionLifetimes::default(),
        google: None,
        uploads_dir: std::env::temp_dir().join(format!("podcast_api_{}", generate_raw_id(10))),
        cors_origins: vec!["http://localhost:3000".to_string()],
        reset_db: false,
    }
}

/// Value of a cookie set by the response, if any
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(|v| v[prefix.len()..].split(';').next().unwrap_or("").to_string())
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// The real router served on an ephemeral port
pub struct TestApp {
    pub base: String,
    pub client: reqwest::Client,
    pub state: AppState,
    pub provider: Arc<FakeProvider>,
}

impl TestApp {
    pub async fn spawn(provider: Arc<FakeProvider>) -> Self {
        let state = AppState::new(test_pool().await, test_config()).with_provider(provider.clone());
        let app = crate::build_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap();

        Self {
            base: format!("http://{}", addr),
            client,
            state,
            provider,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Start the OAuth flow and return the cookies a browser would carry back
    pub async fn begin_login(&self, intended: Option<&str>) -> (String, String) {
        let mut url = self.url("/auth/google/redirect");
        if let Some(intended) = intended {
            url = format!("{}?intended={}", url, urlencoding::encode(intended));
        }
        let response = self.client.get(url).send().await.unwrap();
        assert_eq!(response.status(), 303);

        let state = set_cookie_value(&response, OAUTH_STATE_COOKIE).expect("state cookie");
        let mut cookies = format!("{}={}", OAUTH_STATE_COOKIE, state);
        if let Some(intended) = set_cookie_value(&response, INTENDED_COOKIE) {
            cookies.push_str(&format!("; {}={}", INTENDED_COOKIE, intended));
        }
        (state, cookies)
    }

    /// Hit the callback the way the provider would after consent
    pub async fn callback(&self, query: &str, cookies: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/auth/google/callback?{}", query)))
            .header(COOKIE, cookies)
            .send()
            .await
            .unwrap()
    }

    /// Full login with the provider's current profile; returns the session token
    pub async fn login(&self) -> String {
        let (state, cookies) = self.begin_login(None).await;
        let response = self
            .callback(&format!("code=test-code&state={}", state), &cookies)
            .await;
        assert_eq!(response.status(), 303);
        set_cookie_value(&response, SESSION_COOKIE).expect("session cookie")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.state.config.uploads_dir.clone()
    }
}
