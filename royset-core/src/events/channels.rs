//! Event channel factories and handles.

use royset_sdk::events::EventEnvelope;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// Bounded so that a stalled reconciliation pipeline applies backpressure
/// to the engine instead of growing memory without limit.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for settlement events.
pub type EventSender = mpsc::Sender<EventEnvelope>;
/// Receiver handle for settlement events.
pub type EventReceiver = mpsc::Receiver<EventEnvelope>;

/// Create a new settlement event channel.
///
/// Returns a (sender, receiver) pair. The sender side belongs to the
/// [`EventLog`](super::EventLog); the receiver side feeds the
/// reconciliation dispatcher.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
