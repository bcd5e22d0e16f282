//! Configuration types for likecast.
//!
//! These types represent the validated runtime configuration handed to the
//! pipeline components at construction. Loading and parsing is handled by
//! the server crate.

mod credentials;
mod dispatch;
mod feed;
mod upstream;

pub use credentials::ClientCredentials;
pub use dispatch::DispatchConfig;
pub use feed::{DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_PROVENANCE, DEFAULT_RULE_TAG, FeedConfig};
pub use upstream::{DEFAULT_API_BASE, DEFAULT_AUTHORIZE_URL, DEFAULT_TOKEN_URL, UpstreamEndpoints};
