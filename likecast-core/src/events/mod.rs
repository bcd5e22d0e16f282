//! Event types and channel infrastructure.
//!
//! # Event Flow
//!
//! 1. `StreamListener` decodes stream lines into `StreamEvent`s and drops the
//!    ones without the configured provenance.
//! 2. Qualifying events travel over a bounded channel to `FanoutDispatcher`.
//!
//! Events are ephemeral: nothing about them is persisted.

pub mod channels;
pub mod types;

pub use channels::{StreamEventReceiver, StreamEventSender, stream_event_channel};
pub use types::StreamEvent;
