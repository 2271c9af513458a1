#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod engine;
pub mod entities;
pub mod error;
pub mod events;
pub mod framework;
pub mod processors;
pub mod transfer;

pub use engine::SettlementEngine;
pub use error::{EngineError, ErrorKind};
