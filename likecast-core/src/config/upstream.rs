//! Upstream endpoint locations.

use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";

/// Where the upstream API lives.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoints {
    /// Root for rules, stream, users and likes.
    pub api_base: Url,
    pub authorize_url: Url,
    pub token_url: Url,
}

impl UpstreamEndpoints {
    /// Endpoints of the public upstream service.
    pub fn public() -> Result<Self, url::ParseError> {
        Ok(Self {
            api_base: Url::parse(DEFAULT_API_BASE)?,
            authorize_url: Url::parse(DEFAULT_AUTHORIZE_URL)?,
            token_url: Url::parse(DEFAULT_TOKEN_URL)?,
        })
    }
}
