//! OAuth identity provider clients

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::models::{CallbackParams, NormalizedProfile, Provider};
use crate::common::config::GoogleOAuthConfig;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} OAuth is not configured")]
    NotConfigured(Provider),

    #[error("OAuth state missing or mismatched")]
    StateMismatch,

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// An OAuth2 provider that can send a browser to its consent screen and
/// turn the resulting callback into a normalized profile.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Consent screen URL carrying the given CSRF `state`
    fn authorization_url(&self, state: &str) -> Result<String, ProviderError>;

    /// Complete the handshake for a callback whose state was already checked
    async fn fetch_profile(
        &self,
        params: &CallbackParams,
    ) -> Result<NormalizedProfile, ProviderError>;
}

/// Identity providers keyed by the provider they serve
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, Arc<dyn IdentityProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, client: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(client.provider(), client);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn IdentityProvider>> {
        self.providers.get(&provider).cloned()
    }
}

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    nickname: Option<String>,
    given_name: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUserInfo> for NormalizedProfile {
    fn from(info: GoogleUserInfo) -> Self {
        NormalizedProfile {
            id: info.sub,
            email: info.email,
            name: info.name,
            nickname: info.nickname.or(info.given_name),
            avatar_url: info.picture,
        }
    }
}

pub struct GoogleIdentityProvider {
    config: Option<GoogleOAuthConfig>,
    client: Client,
}

impl GoogleIdentityProvider {
    pub fn new(config: Option<GoogleOAuthConfig>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    fn config(&self) -> Result<&GoogleOAuthConfig, ProviderError> {
        self.config
            .as_ref()
            .ok_or(ProviderError::NotConfigured(Provider::Google))
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        let config = self.config()?;
        let params = [
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(ProviderError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let token = response
            .json::<GoogleTokenResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(token.access_token)
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        let config = self.config()?;
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&config.client_id),
            urlencoding::encode(&config.redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        ))
    }

    async fn fetch_profile(
        &self,
        params: &CallbackParams,
    ) -> Result<NormalizedProfile, ProviderError> {
        if let Some(error) = &params.error {
            return Err(ProviderError::Denied(error.clone()));
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("no authorization code provided".to_string())
            })?;

        let access_token = self.exchange_code(code).await?;

        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::InvalidResponse(format!(
                "userinfo returned HTTP {}",
                response.status()
            )));
        }

        let info = response
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if info.sub.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "profile has no subject identifier".to_string(),
            ));
        }

        Ok(info.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GoogleIdentityProvider {
        GoogleIdentityProvider::new(Some(GoogleOAuthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
        }))
    }

    #[test]
    fn test_authorization_url() {
        let url = configured().authorization_url("abc123").unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc123"));
    }

    #[test]
    fn test_unconfigured_provider() {
        let google = GoogleIdentityProvider::new(None);
        assert!(matches!(
            google.authorization_url("s"),
            Err(ProviderError::NotConfigured(Provider::Google))
        ));
    }

    #[tokio::test]
    async fn test_denied_callback_never_calls_google() {
        let params = CallbackParams {
            code: None,
            state: Some("s".to_string()),
            error: Some("access_denied".to_string()),
        };
        let err = configured().fetch_profile(&params).await.unwrap_err();
        assert!(matches!(err, ProviderError::Denied(ref e) if e == "access_denied"));
    }

    #[tokio::test]
    async fn test_missing_code() {
        let err = configured()
            .fetch_profile(&CallbackParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn test_userinfo_normalization() {
        let info: GoogleUserInfo = serde_json::from_value(serde_json::json!({
            "sub": "1234",
            "email": "someone@example.com",
            "given_name": "Some",
            "picture": "https://example.com/a.png"
        }))
        .unwrap();

        let profile = NormalizedProfile::from(info);
        assert_eq!(profile.id, "1234");
        assert_eq!(profile.name, None);
        assert_eq!(profile.nickname.as_deref(), Some("Some"));
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProviderRegistry::new().register(Arc::new(configured()));
        assert!(registry.get(Provider::Google).is_some());
        assert!(ProviderRegistry::new().get(Provider::Google).is_none());
    }
}
