//! TOML file configuration structures.
//!
//! These structs directly map to the `likecast.toml` file format. Secrets are
//! never read from the file.

use likecast_core::config::{
    DEFAULT_API_BASE, DEFAULT_AUTHORIZE_URL, DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_PROVENANCE,
    DEFAULT_RULE_TAG, DEFAULT_TOKEN_URL, DispatchConfig as RuntimeDispatchConfig,
};
use likecast_core::store::DEFAULT_HASH_KEY;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:3000").
    pub listen: SocketAddr,
    /// Externally reachable base URL; the OAuth2 redirect URI is
    /// `{public_url}/callback`.
    pub public_url: String,
    /// Where `/callback` sends the browser after a successful registration
    /// (e.g. "/"). Unset answers with a JSON confirmation instead.
    pub success_redirect: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            public_url: "http://127.0.0.1:3000".to_string(),
            success_redirect: None,
        }
    }
}

/// Upstream endpoint section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

/// Stream rule and qualification section.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Account whose posts are liked.
    pub source_user_id: String,
    #[serde(default = "default_provenance")]
    pub provenance: String,
    #[serde(default = "default_rule_tag")]
    pub rule_tag: String,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
}

fn default_provenance() -> String {
    DEFAULT_PROVENANCE.to_string()
}

fn default_rule_tag() -> String {
    DEFAULT_RULE_TAG.to_string()
}

fn default_heartbeat_timeout_secs() -> u64 {
    DEFAULT_HEARTBEAT_TIMEOUT.as_secs()
}

/// Fan-out limits section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub max_concurrent_subscribers: usize,
    pub max_in_flight_events: usize,
    pub event_buffer: usize,
    pub drain_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let runtime = RuntimeDispatchConfig::default();
        Self {
            max_concurrent_subscribers: runtime.max_concurrent_subscribers,
            max_in_flight_events: runtime.max_in_flight_events,
            event_buffer: runtime.event_buffer,
            drain_timeout_secs: runtime.drain_timeout.as_secs(),
        }
    }
}

/// Credential store section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub redis_url: String,
    /// Redis hash holding one record per subscriber.
    pub hash_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            hash_key: DEFAULT_HASH_KEY.to_string(),
        }
    }
}
