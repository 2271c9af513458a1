//! Database command framework.
//!
//! Mirror queries are modelled as command structs processed through
//! [`kanau::processor::Processor`] impls on [`DatabaseProcessor`].
//! Multi-statement writes that must land atomically use `_tx` associated
//! functions on the entity types instead, taking an open transaction.

use sqlx::SqlitePool;

/// Processor executing commands against the pool.
pub struct DatabaseProcessor {
    pub pool: SqlitePool,
}
