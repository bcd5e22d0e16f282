//! Fan-out concurrency limits.

use std::time::Duration;

/// Bounds on fan-out work.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Subscriber branches running at once within one event.
    pub max_concurrent_subscribers: usize,
    /// Events fanning out at once.
    pub max_in_flight_events: usize,
    /// Capacity of the queue between the stream listener and the dispatcher.
    /// Events arriving while it is full are dropped.
    pub event_buffer: usize,
    /// How long in-flight fan-outs may keep running after shutdown is signaled.
    pub drain_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_subscribers: 16,
            max_in_flight_events: 4,
            event_buffer: 256,
            drain_timeout: Duration::from_secs(30),
        }
    }
}
