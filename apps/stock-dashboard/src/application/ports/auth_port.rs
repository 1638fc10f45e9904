//! Auth Port (Driven Port)
//!
//! Password login yields a bearer token; the port owns installing it on
//! subsequent requests.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::clock::flexible_datetime;

/// Token issued by a successful login.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Token scheme, normally `bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Registration request.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Plain-text password, sent once over TLS.
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Registration time.
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Port for authentication.
#[async_trait]
pub trait AuthPort: Send + Sync {
    /// Exchange credentials for a token.
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError>;

    /// Create an account.
    async fn register(&self, user: &NewUser) -> Result<UserProfile, ApiError>;

    /// The user owning the installed token.
    async fn current_user(&self) -> Result<UserProfile, ApiError>;

    /// Install or clear the bearer token used on later requests.
    fn set_bearer_token(&self, token: Option<String>);
}
