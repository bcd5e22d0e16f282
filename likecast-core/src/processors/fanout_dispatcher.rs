//! FanoutDispatcher processor.
//!
//! The FanoutDispatcher is responsible for:
//! - Receiving qualifying `StreamEvent`s from the listener queue
//! - Reading the full subscriber snapshot once per event
//! - Resolving each subscriber's credential, refreshing it when expired
//! - Liking the post on behalf of every subscriber
//!
//! Subscriber branches of one event run concurrently up to
//! `max_concurrent_subscribers`, and up to `max_in_flight_events` events fan
//! out at once. A failing branch is logged and counted; it never cancels its
//! siblings or the events around it.

use super::credential_refresher::{CredentialRefresher, RefreshError};
use crate::config::DispatchConfig;
use crate::counters::DispatchCounters;
use crate::entities::Credential;
use crate::events::{StreamEvent, StreamEventReceiver};
use crate::store::{CredentialStore, StoreError};
use crate::upstream::{ActionApi, UpstreamError};
use futures_util::{StreamExt, stream};
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Why one subscriber's branch of a fan-out failed.
#[derive(Debug, Error)]
pub enum FanoutFailure {
    /// The expired credential could not be refreshed
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// The like call failed
    #[error("like failed: {0}")]
    Action(#[source] UpstreamError),
}

/// Outcome of one event's fan-out.
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub event_id: String,
    /// Subscribers the post was liked for.
    pub liked: Vec<String>,
    /// Number of credentials refreshed along the way.
    pub refreshed: usize,
    pub failed: Vec<(String, FanoutFailure)>,
}

struct BranchOutcome {
    subject_id: String,
    refreshed: bool,
    result: Result<(), FanoutFailure>,
}

/// FanoutDispatcher likes every qualifying post for every subscriber.
pub struct FanoutDispatcher {
    store: Arc<dyn CredentialStore>,
    refresher: CredentialRefresher,
    action: Arc<dyn ActionApi>,
    config: DispatchConfig,
    counters: Arc<DispatchCounters>,
}

impl FanoutDispatcher {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: CredentialRefresher,
        action: Arc<dyn ActionApi>,
        config: DispatchConfig,
        counters: Arc<DispatchCounters>,
    ) -> Self {
        Self {
            store,
            refresher,
            action,
            config,
            counters,
        }
    }

    /// Fan one event out to every subscriber in the current snapshot.
    ///
    /// Resolves once every branch reached a terminal state. Only a failed
    /// snapshot read is an error; branch failures are part of the report.
    #[tracing::instrument(skip_all, err, name = "FanoutDispatcher:handle", fields(post_id = %event.id))]
    pub async fn handle(&self, event: &StreamEvent) -> Result<FanoutReport, StoreError> {
        let subscribers = self
            .store
            .get_all()
            .await
            .inspect_err(|_| self.counters.snapshot_failed())?;
        debug!(subscribers = subscribers.len(), "Fanning out");

        let outcomes: Vec<BranchOutcome> = stream::iter(subscribers.into_values())
            .map(|credential| self.branch(credential, &event.id))
            .buffer_unordered(self.config.max_concurrent_subscribers.max(1))
            .collect()
            .await;

        let mut report = FanoutReport {
            event_id: event.id.clone(),
            ..Default::default()
        };
        for outcome in outcomes {
            if outcome.refreshed {
                report.refreshed += 1;
            }
            match outcome.result {
                Ok(()) => report.liked.push(outcome.subject_id),
                Err(e) => report.failed.push((outcome.subject_id, e)),
            }
        }
        self.counters.event_dispatched();
        Ok(report)
    }

    async fn branch(&self, credential: Credential, post_id: &str) -> BranchOutcome {
        let subject_id = credential.subject_id.clone();

        let resolved = match self.refresher.process(credential).await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.counters.refresh_failed();
                warn!(subject_id = %subject_id, post_id, error = %e, "Skipping subscriber, credential refresh failed");
                return BranchOutcome {
                    subject_id,
                    refreshed: false,
                    result: Err(e.into()),
                };
            }
        };
        if resolved.updated {
            self.counters.refreshed();
        }

        let result = match self
            .action
            .like(&resolved.credential.access_token, &subject_id, post_id)
            .await
        {
            Ok(()) => {
                self.counters.like_sent();
                debug!(subject_id = %subject_id, post_id, "Liked");
                Ok(())
            }
            Err(e) => {
                self.counters.like_failed();
                warn!(subject_id = %subject_id, post_id, error = %e, "Like failed");
                Err(FanoutFailure::Action(e))
            }
        };
        BranchOutcome {
            subject_id,
            refreshed: resolved.updated,
            result,
        }
    }

    /// Run the FanoutDispatcher.
    ///
    /// Consumes events until the channel closes or shutdown is signaled, then
    /// gives in-flight fan-outs up to `drain_timeout` to finish. Events still
    /// queued at shutdown are discarded.
    pub async fn run(
        self: Arc<Self>,
        mut events_rx: StreamEventReceiver,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("FanoutDispatcher started");

        let permits = Arc::new(Semaphore::new(self.config.max_in_flight_events.max(1)));
        let mut in_flight = JoinSet::new();

        loop {
            while let Some(joined) = in_flight.try_join_next() {
                log_join(joined);
            }

            let permit = tokio::select! {
                biased;

                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    info!("FanoutDispatcher received shutdown signal");
                    break;
                }

                permit = permits.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break;
            };

            let event = tokio::select! {
                biased;

                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    info!("FanoutDispatcher received shutdown signal");
                    break;
                }

                event = events_rx.recv() => event,
            };
            let Some(event) = event else {
                info!("StreamEvent channel closed");
                break;
            };

            debug!(post_id = %event.id, "Received StreamEvent");
            let dispatcher = self.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                dispatcher.dispatch(event).await;
            });
        }

        if !in_flight.is_empty() {
            info!(in_flight = in_flight.len(), "Waiting for in-flight fan-outs");
            let drained = tokio::time::timeout(self.config.drain_timeout, async {
                while let Some(joined) = in_flight.join_next().await {
                    log_join(joined);
                }
            })
            .await;
            if drained.is_err() {
                warn!(
                    remaining = in_flight.len(),
                    "Drain timeout elapsed, cancelling in-flight fan-outs"
                );
                in_flight.abort_all();
            }
        }

        info!("FanoutDispatcher shutdown complete");
    }

    async fn dispatch(&self, event: StreamEvent) {
        let post_id = event.id.clone();
        match self.process(event).await {
            Ok(report) => info!(
                post_id = %report.event_id,
                liked = report.liked.len(),
                refreshed = report.refreshed,
                failed = report.failed.len(),
                "Fan-out complete"
            ),
            Err(e) => error!(
                post_id = %post_id,
                error = %e,
                "Failed to read subscribers, event skipped"
            ),
        }
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Fan-out task failed");
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl Processor<StreamEvent> for FanoutDispatcher {
    type Output = FanoutReport;
    type Error = StoreError;

    async fn process(&self, event: StreamEvent) -> Result<FanoutReport, StoreError> {
        self.handle(&event).await
    }
}
