//! Seams to the upstream service.
//!
//! Each trait covers one upstream concern so components can be built and
//! tested against fakes. [`HttpUpstream`] implements all of them over the
//! SDK clients.

mod http;

pub use http::HttpUpstream;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use likecast_sdk::client::ClientError;
use likecast_sdk::objects::rules::{RuleUpdateRequest, RuleUpdateResponse, StreamRule};
use likecast_sdk::objects::tokens::TokenResponse;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by upstream calls.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-2xx status.
    #[error("upstream returned status {status}: {body}")]
    Api {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    /// Connection-level failure (DNS, TLS, reset, timeout).
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// The upstream answered 2xx with a body we could not decode.
    #[error("malformed upstream response: {0}")]
    Decode(String),

    /// The upstream accepted the call but reported it did not take effect.
    #[error("upstream did not apply the action")]
    NotApplied,
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401/403: the credential used for the call is not accepted.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Retry hint supplied by the upstream, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            UpstreamError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<ClientError> for UpstreamError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Api {
                status,
                body,
                retry_after_secs,
            } => UpstreamError::Api {
                status: status.as_u16(),
                body,
                retry_after: retry_after_secs.map(Duration::from_secs),
            },
            ClientError::Http(e) if e.is_decode() => UpstreamError::Decode(e.to_string()),
            ClientError::Http(e) => match e.status() {
                Some(status) => UpstreamError::Api {
                    status: status.as_u16(),
                    body: e.to_string(),
                    retry_after: None,
                },
                None => UpstreamError::Transport(e.to_string()),
            },
            ClientError::Json(e) => UpstreamError::Decode(e.to_string()),
            ClientError::Url(e) => UpstreamError::Transport(e.to_string()),
        }
    }
}

/// Raw byte chunks of an open stream connection.
pub type FeedStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// Stream rule management.
#[async_trait]
pub trait RulesApi: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<StreamRule>, UpstreamError>;

    async fn update_rules(&self, request: RuleUpdateRequest) -> Result<RuleUpdateResponse, UpstreamError>;
}

/// Opens the filtered stream.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Resolves once the upstream accepted the connection.
    async fn connect(&self) -> Result<FeedStream, UpstreamError>;
}

/// OAuth2 refresh-token grant.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, UpstreamError>;
}

/// The per-subscriber downstream action.
#[async_trait]
pub trait ActionApi: Send + Sync {
    /// Like `post_id` as `subject_id`, authenticated by `access_token`.
    async fn like(&self, access_token: &str, subject_id: &str, post_id: &str) -> Result<(), UpstreamError>;
}
