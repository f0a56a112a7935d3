//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// OAuth providers accepted on the `/auth/{provider}` routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
}

impl Provider {
    pub const ALL: [Provider; 1] = [Provider::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnsupportedProvider(pub String);

impl FromStr for Provider {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            other => Err(UnsupportedProvider(other.to_string())),
        }
    }
}

/// Provider-agnostic profile returned by a successful OAuth handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

/// Account database model (`users` table)
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub avatar: Option<String>,
    pub email_verified_at: Option<String>,
    #[serde(skip_serializing)]
    pub remember_token: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Session token claims
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    /// Remember token bound into persistent sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmb: Option<String>,
}

/// Query parameters accepted by `GET /auth/{provider}/redirect`
#[derive(Debug, Default, Deserialize)]
pub struct RedirectParams {
    pub intended: Option<String>,
}

/// Query parameters Google (or any OAuth2 provider) sends to the callback
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Query parameters of the login entry point
#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub status: Option<String>,
}
