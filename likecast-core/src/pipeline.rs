//! Wiring of the processors into one running pipeline.
//!
//! Startup order matters: the stream rule is replaced first, and only once
//! the upstream confirmed it is the stream opened. The dispatcher runs on its
//! own task so the listener never waits on fan-out work.

use crate::config::{DispatchConfig, FeedConfig};
use crate::counters::DispatchCounters;
use crate::events::stream_event_channel;
use crate::processors::{
    CredentialRefresher, FanoutDispatcher, FeedError, FeedRule, ProvenanceFilter, RuleSyncError,
    RuleSynchronizer, StreamListener,
};
use crate::store::CredentialStore;
use crate::upstream::{ActionApi, AuthApi, FeedConnector, RulesApi};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

/// Errors that stop the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Startup rule synchronization failed; the stream was never opened
    #[error(transparent)]
    RuleSync(#[from] RuleSyncError),

    /// The upstream rejected the stream connection
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// The dispatcher task panicked
    #[error("dispatcher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything the pipeline components are built from.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<dyn CredentialStore>,
    pub rules: Arc<dyn RulesApi>,
    pub feed: Arc<dyn FeedConnector>,
    pub auth: Arc<dyn AuthApi>,
    pub action: Arc<dyn ActionApi>,
    pub feed_config: FeedConfig,
    pub dispatch_config: DispatchConfig,
    pub counters: Arc<DispatchCounters>,
}

impl PipelineContext {
    /// Context backed by a single implementation of every upstream seam.
    pub fn from_upstream<U>(
        store: Arc<dyn CredentialStore>,
        upstream: Arc<U>,
        feed_config: FeedConfig,
        dispatch_config: DispatchConfig,
    ) -> Self
    where
        U: RulesApi + FeedConnector + AuthApi + ActionApi + 'static,
    {
        Self {
            store,
            rules: upstream.clone(),
            feed: upstream.clone(),
            auth: upstream.clone(),
            action: upstream,
            feed_config,
            dispatch_config,
            counters: Arc::new(DispatchCounters::default()),
        }
    }
}

pub struct Pipeline {
    context: PipelineContext,
}

impl Pipeline {
    pub fn new(context: PipelineContext) -> Self {
        Self { context }
    }

    pub fn counters(&self) -> Arc<DispatchCounters> {
        self.context.counters.clone()
    }

    /// Synchronize the stream rule, then listen and fan out until shutdown
    /// or a fatal upstream rejection.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> Result<(), PipelineError> {
        let PipelineContext {
            store,
            rules,
            feed,
            auth,
            action,
            feed_config,
            dispatch_config,
            counters,
        } = self.context;

        let rule = FeedRule::authored_by(&feed_config.source_user_id, feed_config.rule_tag.clone());
        RuleSynchronizer::new(rules).synchronize(&rule).await?;

        let (events_tx, events_rx) = stream_event_channel(dispatch_config.event_buffer);
        let dispatcher = Arc::new(FanoutDispatcher::new(
            store.clone(),
            CredentialRefresher::new(store, auth),
            action,
            dispatch_config,
            counters.clone(),
        ));
        let dispatcher_handle = tokio::spawn(dispatcher.run(events_rx, shutdown_rx.clone()));

        let listener = StreamListener::new(
            feed,
            ProvenanceFilter::new(feed_config.provenance),
            feed_config.heartbeat_timeout,
            counters,
        );
        let listened = listener.run(events_tx, shutdown_rx).await;

        dispatcher_handle.await?;
        listened?;
        info!("Pipeline stopped");
        Ok(())
    }
}
