//! Shared wire objects for Royset.
//!
//! This crate defines the data that crosses process boundaries: the
//! authoritative settlement event schema consumed by the reconciliation
//! pipeline, and the request/response objects of the engine API. It carries
//! no engine logic and no database access.

pub mod api;
pub mod events;
pub mod objects;

pub use events::{EventEnvelope, EventKey, EventPayload};
pub use objects::{PayoutRequest, PayoutStatus};
