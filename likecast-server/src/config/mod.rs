//! Configuration module for likecast-server.
//!
//! Handles loading configuration from the TOML file and applying CLI and
//! environment overrides. Client secrets and the app bearer token are taken
//! from the environment only.

pub mod file;

use crate::config::file::FileConfig;
use likecast_core::config::{DispatchConfig, FeedConfig, UpstreamEndpoints};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid URL in {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// HTTP surface settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    /// OAuth2 redirect URI registered with the upstream.
    pub redirect_uri: Url,
    pub success_redirect: Option<String>,
}

/// Where credentials are stored.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub redis_url: String,
    pub hash_key: String,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerSettings,
    pub upstream: UpstreamEndpoints,
    pub feed: FeedConfig,
    pub dispatch: DispatchConfig,
    pub store: StoreSettings,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    redis_url_override: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(
        config_path: impl AsRef<Path>,
        listen_override: Option<SocketAddr>,
        redis_url_override: Option<String>,
    ) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            redis_url_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    /// 4. Build the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(redis_url) = &self.redis_url_override {
            file_config.store.redis_url = redis_url.clone();
        }

        validate(&file_config)?;
        build_loaded_config(file_config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let source_user_id = &config.feed.source_user_id;
    if source_user_id.is_empty() || source_user_id.contains(char::is_whitespace) {
        return Err(ConfigError::ValidationError(format!(
            "feed.source_user_id {source_user_id:?} is not a valid user id"
        )));
    }
    if config.feed.provenance.is_empty() {
        return Err(ConfigError::ValidationError(
            "feed.provenance must not be empty".to_string(),
        ));
    }
    if config.feed.heartbeat_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "feed.heartbeat_timeout_secs must be positive".to_string(),
        ));
    }

    if let Some(target) = &config.server.success_redirect {
        if target.parse::<axum::http::Uri>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "server.success_redirect {target:?} is not a valid URI"
            )));
        }
    }

    let dispatch = &config.dispatch;
    for (name, value) in [
        ("dispatch.max_concurrent_subscribers", dispatch.max_concurrent_subscribers),
        ("dispatch.max_in_flight_events", dispatch.max_in_flight_events),
        ("dispatch.event_buffer", dispatch.event_buffer),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{name} must be positive")));
        }
    }
    Ok(())
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { field, source })
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let mut public_url = parse_url("server.public_url", &file_config.server.public_url)?;
    if !public_url.path().ends_with('/') {
        let path = format!("{}/", public_url.path());
        public_url.set_path(&path);
    }
    let redirect_uri = public_url
        .join("callback")
        .map_err(|source| ConfigError::InvalidUrl {
            field: "server.public_url",
            source,
        })?;

    let upstream = UpstreamEndpoints {
        api_base: parse_url("upstream.api_base", &file_config.upstream.api_base)?,
        authorize_url: parse_url("upstream.authorize_url", &file_config.upstream.authorize_url)?,
        token_url: parse_url("upstream.token_url", &file_config.upstream.token_url)?,
    };

    let feed = FeedConfig {
        source_user_id: file_config.feed.source_user_id,
        provenance: file_config.feed.provenance,
        rule_tag: file_config.feed.rule_tag,
        heartbeat_timeout: Duration::from_secs(file_config.feed.heartbeat_timeout_secs),
    };

    let dispatch = DispatchConfig {
        max_concurrent_subscribers: file_config.dispatch.max_concurrent_subscribers,
        max_in_flight_events: file_config.dispatch.max_in_flight_events,
        event_buffer: file_config.dispatch.event_buffer,
        drain_timeout: Duration::from_secs(file_config.dispatch.drain_timeout_secs),
    };

    Ok(LoadedConfig {
        server: ServerSettings {
            listen: file_config.server.listen,
            redirect_uri,
            success_redirect: file_config.server.success_redirect,
        },
        upstream,
        feed,
        dispatch,
        store: StoreSettings {
            redis_url: file_config.store.redis_url,
            hash_key: file_config.store.hash_key,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "[feed]\nsource_user_id = \"42\"\n";

    fn loader() -> ConfigLoader {
        ConfigLoader::new("./likecast.toml", None, None)
    }

    #[test]
    fn test_build_runtime_config() {
        let config = loader()
            .load_str(
                r#"
[server]
public_url = "https://likecast.example.com/"

[feed]
source_user_id = "42"

[dispatch]
drain_timeout_secs = 5
"#,
            )
            .unwrap();
        assert_eq!(
            config.server.redirect_uri.as_str(),
            "https://likecast.example.com/callback"
        );
        assert_eq!(config.feed.source_user_id, "42");
        assert_eq!(config.feed.heartbeat_timeout, Duration::from_secs(30));
        assert_eq!(config.dispatch.drain_timeout, Duration::from_secs(5));
        assert_eq!(config.upstream.token_url.as_str(), "https://api.twitter.com/2/oauth2/token");
    }

    #[test]
    fn test_overrides_win() {
        let listen: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let loader = ConfigLoader::new("unused", Some(listen), Some("redis://other:6379".into()));
        let config = loader.load_str(MINIMAL).unwrap();
        assert_eq!(config.server.listen, listen);
        assert_eq!(config.store.redis_url, "redis://other:6379");
    }

    #[test]
    fn test_rejects_zero_limits() {
        let result = loader().load_str(
            "[feed]\nsource_user_id = \"42\"\n[dispatch]\nmax_concurrent_subscribers = 0\n",
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("max_concurrent_subscribers")));

        let result = loader().load_str("[feed]\nsource_user_id = \"42\"\nheartbeat_timeout_secs = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_bad_source_user_id() {
        assert!(matches!(
            loader().load_str("[feed]\nsource_user_id = \"\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            loader().load_str("[feed]\nsource_user_id = \"42 OR from:7\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_success_redirect() {
        let config = loader().load_str(MINIMAL).unwrap();
        assert_eq!(config.server.success_redirect, None);

        let config = loader()
            .load_str("[server]\nsuccess_redirect = \"/\"\n[feed]\nsource_user_id = \"42\"\n")
            .unwrap();
        assert_eq!(config.server.success_redirect.as_deref(), Some("/"));

        let result = loader()
            .load_str("[server]\nsuccess_redirect = \"/done page\"\n[feed]\nsource_user_id = \"42\"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("success_redirect")));
    }

    #[test]
    fn test_rejects_bad_urls() {
        let result = loader().load_str("[upstream]\ntoken_url = \"not a url\"\n[feed]\nsource_user_id = \"42\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidUrl {
                field: "upstream.token_url",
                ..
            })
        ));
    }
}
