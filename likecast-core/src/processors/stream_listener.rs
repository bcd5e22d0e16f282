//! StreamListener processor.
//!
//! The StreamListener is responsible for:
//! - Holding the long-lived filtered-stream connection open
//! - Splitting the byte stream into lines and decoding each one
//! - Dropping posts without the configured provenance
//! - Handing qualifying events to the dispatcher without ever waiting on it
//! - Reconnecting after drops, silent connections and in-band disconnects
//!
//! Only an authentication rejection (401/403) or shutdown ends it.

use crate::counters::DispatchCounters;
use crate::events::{StreamEvent, StreamEventSender};
use crate::upstream::{FeedConnector, FeedStream, UpstreamError};
use crate::utils::backoff::{DisconnectKind, ReconnectBackoff};
use crate::utils::line_buffer::LineBuffer;
use futures_util::StreamExt;
use likecast_sdk::objects::posts::StreamMessage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Errors that end the StreamListener.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The upstream refused the connection outright
    #[error("stream connection rejected: {0}")]
    Rejected(#[source] UpstreamError),
}

/// Provenance qualification for incoming posts.
#[derive(Debug, Clone)]
pub struct ProvenanceFilter {
    provenance: String,
}

impl ProvenanceFilter {
    pub fn new(provenance: impl Into<String>) -> Self {
        Self {
            provenance: provenance.into(),
        }
    }

    pub fn accepts(&self, event: &StreamEvent) -> bool {
        event.has_provenance(&self.provenance)
    }
}

/// How one connection ended.
enum SessionEnd {
    Shutdown,
    /// The dispatcher is gone; nothing would consume further events.
    ConsumerGone,
    Dropped {
        kind: DisconnectKind,
        hint: Option<Duration>,
        reason: String,
    },
}

/// StreamListener owns the filtered-stream connection.
pub struct StreamListener {
    connector: Arc<dyn FeedConnector>,
    filter: ProvenanceFilter,
    heartbeat_timeout: Duration,
    counters: Arc<DispatchCounters>,
}

impl StreamListener {
    pub fn new(
        connector: Arc<dyn FeedConnector>,
        filter: ProvenanceFilter,
        heartbeat_timeout: Duration,
        counters: Arc<DispatchCounters>,
    ) -> Self {
        Self {
            connector,
            filter,
            heartbeat_timeout,
            counters,
        }
    }

    /// Run the StreamListener.
    ///
    /// Returns `Ok(())` on shutdown or when the event receiver is dropped,
    /// and an error when the upstream rejects the connection.
    pub async fn run(
        self,
        events_tx: StreamEventSender,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), FeedError> {
        info!("StreamListener started");
        let mut backoff = ReconnectBackoff::default();

        loop {
            let connected = tokio::select! {
                biased;

                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    info!("StreamListener received shutdown signal");
                    return Ok(());
                }

                connected = self.connector.connect() => connected,
            };

            let end = match connected {
                Ok(stream) => {
                    info!("Stream connected");
                    self.consume(stream, &events_tx, &mut shutdown_rx, &mut backoff)
                        .await
                }
                Err(e) if e.is_auth_failure() => {
                    error!(error = %e, "Stream connection rejected");
                    return Err(FeedError::Rejected(e));
                }
                Err(e) => SessionEnd::Dropped {
                    kind: DisconnectKind::classify(&e),
                    hint: e.retry_after(),
                    reason: e.to_string(),
                },
            };

            let (kind, hint, reason) = match end {
                SessionEnd::Shutdown => {
                    info!("StreamListener received shutdown signal");
                    return Ok(());
                }
                SessionEnd::ConsumerGone => {
                    info!("StreamEvent receiver dropped, stopping StreamListener");
                    return Ok(());
                }
                SessionEnd::Dropped { kind, hint, reason } => (kind, hint, reason),
            };

            let delay = backoff.next_delay(kind, hint);
            warn!(
                reason = %reason,
                kind = ?kind,
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Stream disconnected, reconnecting"
            );

            tokio::select! {
                biased;

                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    info!("StreamListener received shutdown signal");
                    return Ok(());
                }

                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Read one connection until it ends.
    async fn consume(
        &self,
        mut stream: FeedStream,
        events_tx: &StreamEventSender,
        shutdown_rx: &mut watch::Receiver<bool>,
        backoff: &mut ReconnectBackoff,
    ) -> SessionEnd {
        let mut lines = LineBuffer::default();

        loop {
            let next = tokio::select! {
                biased;

                _ = shutdown_rx.wait_for(|stop| *stop) => return SessionEnd::Shutdown,

                next = tokio::time::timeout(self.heartbeat_timeout, stream.next()) => next,
            };

            let chunk = match next {
                Err(_) => {
                    return SessionEnd::Dropped {
                        kind: DisconnectKind::Network,
                        hint: None,
                        reason: format!("no data for {:?}", self.heartbeat_timeout),
                    };
                }
                Ok(None) => {
                    return SessionEnd::Dropped {
                        kind: DisconnectKind::Network,
                        hint: None,
                        reason: "stream closed by upstream".to_string(),
                    };
                }
                Ok(Some(Err(e))) => {
                    return SessionEnd::Dropped {
                        kind: DisconnectKind::classify(&e),
                        hint: e.retry_after(),
                        reason: e.to_string(),
                    };
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            let (complete, overflowed) = lines.push(&chunk);
            if overflowed {
                warn!("Discarding oversized stream line");
            }
            if !complete.is_empty() {
                backoff.reset();
            }

            for line in complete {
                match StreamMessage::decode(&line) {
                    Ok(StreamMessage::KeepAlive) => debug!("Stream keep-alive"),
                    Ok(StreamMessage::Post { post, .. }) => {
                        let event = StreamEvent::from(post);
                        if !self.filter.accepts(&event) {
                            debug!(post_id = %event.id, source = ?event.source, "Ignoring post with other provenance");
                            continue;
                        }
                        if let Some(end) = self.forward(event, events_tx) {
                            return end;
                        }
                    }
                    Ok(StreamMessage::Disconnect(problems)) => {
                        let reason = problems
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("; ");
                        return SessionEnd::Dropped {
                            kind: DisconnectKind::Network,
                            hint: None,
                            reason: format!("upstream disconnect: {reason}"),
                        };
                    }
                    Err(e) => warn!(error = %e, "Skipping undecodable stream line"),
                }
            }
        }
    }

    fn forward(&self, event: StreamEvent, events_tx: &StreamEventSender) -> Option<SessionEnd> {
        let post_id = event.id.clone();
        match events_tx.try_send(event) {
            Ok(()) => {
                self.counters.event_queued();
                debug!(post_id = %post_id, "Queued StreamEvent");
                None
            }
            Err(TrySendError::Full(_)) => {
                self.counters.event_dropped();
                warn!(post_id = %post_id, "Dispatcher queue full, dropping event");
                None
            }
            Err(TrySendError::Closed(_)) => Some(SessionEnd::ConsumerGone),
        }
    }
}
