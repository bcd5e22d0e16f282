//! Stream reconnect delays.
//!
//! Network-level drops back off linearly in 250 ms steps up to 16 s. HTTP
//! errors back off exponentially from 5 s up to 320 s, and rate limiting
//! exponentially from 60 s up to 960 s. An upstream retry hint always wins.

use crate::upstream::UpstreamError;
use std::time::Duration;

const NETWORK_STEP: Duration = Duration::from_millis(250);
const NETWORK_MAX: Duration = Duration::from_secs(16);
const HTTP_BASE_SECS: u64 = 5;
const HTTP_MAX_EXPONENT: u32 = 6;
const RATE_LIMIT_BASE_SECS: u64 = 60;
const RATE_LIMIT_MAX_EXPONENT: u32 = 4;

/// Why the last connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectKind {
    Network,
    Http,
    RateLimited,
}

impl DisconnectKind {
    pub fn classify(error: &UpstreamError) -> Self {
        match error {
            e if e.is_rate_limited() => DisconnectKind::RateLimited,
            UpstreamError::Api { .. } => DisconnectKind::Http,
            _ => DisconnectKind::Network,
        }
    }
}

/// Delay before reconnect attempt number `attempt` (0-based).
pub fn reconnect_delay(kind: DisconnectKind, attempt: u32) -> Duration {
    match kind {
        DisconnectKind::Network => NETWORK_STEP
            .saturating_mul(attempt.saturating_add(1))
            .min(NETWORK_MAX),
        DisconnectKind::Http => {
            Duration::from_secs(HTTP_BASE_SECS * 2u64.pow(attempt.min(HTTP_MAX_EXPONENT)))
        }
        DisconnectKind::RateLimited => Duration::from_secs(
            RATE_LIMIT_BASE_SECS * 2u64.pow(attempt.min(RATE_LIMIT_MAX_EXPONENT)),
        ),
    }
}

/// Attempt counter for consecutive failed connections.
#[derive(Debug, Default)]
pub struct ReconnectBackoff {
    attempt: u32,
}

impl ReconnectBackoff {
    /// Delay for the next attempt; `hint` is an upstream-provided delay.
    pub fn next_delay(&mut self, kind: DisconnectKind, hint: Option<Duration>) -> Duration {
        let delay = hint.unwrap_or_else(|| reconnect_delay(kind, self.attempt));
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Forget past failures once a connection delivered data.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
