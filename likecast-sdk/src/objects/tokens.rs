//! OAuth2 token endpoint bodies.

use serde::{Deserialize, Serialize};

/// Scopes requested when a subscriber registers. `offline.access` is what
/// makes the upstream issue a refresh token.
pub const REGISTRATION_SCOPES: &[&str] = &["tweet.read", "like.write", "users.read", "offline.access"];

/// Successful response of the token endpoint, for both the
/// `authorization_code` and `refresh_token` grants.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token_type", &self.token_type)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}
