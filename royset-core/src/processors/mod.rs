//! Background workers of the reconciliation pipeline.

pub mod dispatcher;
pub mod lag_monitor;
pub mod reconciler;

pub use dispatcher::{spawn_reconcilers, Dispatcher};
pub use lag_monitor::{measure_lag, LagMonitor, LagObservation};
pub use reconciler::{ingest, IngestState, IngestionWorker, ReconcileError};
