//! Runtime configuration: the sections that survive a SIGHUP reload.
//!
//! The listen address, database path, operator and payout endpoint are
//! fixed at startup; reloading only swaps the reconciliation knobs.

/// Reloadable configuration shared across handlers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Lag above this many events makes the lag endpoint report "lagging".
    pub lag_warn_threshold: i64,
}
