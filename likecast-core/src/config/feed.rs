//! Stream rule and event qualification settings.

use std::time::Duration;

/// Default tag attached to the installed stream rule.
pub const DEFAULT_RULE_TAG: &str = "ID filter";

/// Default provenance value an event must carry to be dispatched.
pub const DEFAULT_PROVENANCE: &str = "twittbot.net";

/// The upstream sends a keep-alive every 20 seconds.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// The account whose posts trigger fan-out (`from:<id>` rule).
    pub source_user_id: String,
    /// Required value of a post's `source` field.
    pub provenance: String,
    pub rule_tag: String,
    /// Reconnect when nothing, not even a keep-alive, arrives for this long.
    pub heartbeat_timeout: Duration,
}

impl FeedConfig {
    pub fn new(source_user_id: impl Into<String>) -> Self {
        Self {
            source_user_id: source_user_id.into(),
            provenance: DEFAULT_PROVENANCE.to_string(),
            rule_tag: DEFAULT_RULE_TAG.to_string(),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }
}
