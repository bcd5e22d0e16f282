//! HTTP clients for the upstream API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod app;
mod oauth;
mod user;

pub use app::AppClient;
pub use oauth::OAuthClient;
pub use user::UserClient;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

/// Header carrying the unix time at which the current rate-limit window resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Errors produced by the SDK HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api {
        status: StatusCode,
        body: String,
        /// Seconds until the upstream says a retry may succeed, if it said so.
        retry_after_secs: Option<u64>,
    },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// The HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Turn a non-2xx response into [`ClientError::Api`], passing successful
/// responses through untouched.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let retry_after_secs = retry_after_secs(resp.headers());
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status,
        body,
        retry_after_secs,
    })
}

pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

/// Read a retry hint from `retry-after` (seconds) or the upstream's
/// `x-rate-limit-reset` (unix seconds).
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };
    if let Some(secs) = header_u64(reqwest::header::RETRY_AFTER.as_str()) {
        return Some(secs);
    }
    let reset = header_u64(RATE_LIMIT_RESET_HEADER)?;
    let now = time::OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
    Some(reset.saturating_sub(now).max(1))
}
