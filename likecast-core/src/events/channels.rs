//! Event channel factories and handles.

use super::types::StreamEvent;
use tokio::sync::mpsc;

/// Sender handle for StreamEvent events.
pub type StreamEventSender = mpsc::Sender<StreamEvent>;
/// Receiver handle for StreamEvent events.
pub type StreamEventReceiver = mpsc::Receiver<StreamEvent>;

/// Create a new StreamEvent channel holding at most `buffer` events.
///
/// The listener never waits on this channel, so `buffer` is the burst the
/// dispatcher may fall behind by before events are dropped.
pub fn stream_event_channel(buffer: usize) -> (StreamEventSender, StreamEventReceiver) {
    mpsc::channel(buffer.max(1))
}
