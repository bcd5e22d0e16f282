//! Processors of the like pipeline.
//!
//! - `RuleSynchronizer`: installs the stream rule once, before anything else
//! - `StreamListener`: owns the stream connection, emits `StreamEvent`
//! - `FanoutDispatcher`: receives `StreamEvent`, likes it for every subscriber
//! - `CredentialRefresher`: used by the dispatcher per subscriber, refreshes
//!   and persists expired credentials

pub mod credential_refresher;
pub mod fanout_dispatcher;
pub mod rule_sync;
pub mod stream_listener;

pub use credential_refresher::{CredentialRefresher, RefreshError, ResolvedCredential};
pub use fanout_dispatcher::{FanoutDispatcher, FanoutFailure, FanoutReport};
pub use rule_sync::{FeedRule, RuleSyncError, RuleSynchronizer};
pub use stream_listener::{FeedError, ProvenanceFilter, StreamListener};
