//! Event infrastructure for the settlement pipeline.
//!
//! The engine is the single writer: every mutating call appends one
//! [`EventEnvelope`](royset_sdk::events::EventEnvelope) to the
//! [`EventLog`], which assigns the log position and forwards a copy to the
//! reconciliation channel. Consumers are free to crash and ask for a
//! replay; delivery is at-least-once and de-duplicated downstream.

pub mod channels;
pub mod log;

pub use channels::{event_channel, EventReceiver, EventSender, DEFAULT_CHANNEL_BUFFER};
pub use log::EventLog;
