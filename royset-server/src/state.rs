//! Application state shared across all request handlers.

use crate::config::runtime::RuntimeConfig;
use royset_core::SettlementEngine;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Mirror database connection pool.
    pub db: SqlitePool,
    /// The settlement engine.
    pub engine: Arc<SettlementEngine>,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: Arc<RwLock<RuntimeConfig>>,
}

impl AppState {
    pub fn new(db: SqlitePool, engine: Arc<SettlementEngine>, config: RuntimeConfig) -> Self {
        Self {
            db,
            engine,
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Get a read lock on the configuration.
    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, RuntimeConfig> {
        self.config.read().await
    }

    /// Update the configuration (used during SIGHUP reload).
    pub async fn update_config(&self, new_config: RuntimeConfig) {
        let mut config = self.config.write().await;
        *config = new_config;
    }
}
