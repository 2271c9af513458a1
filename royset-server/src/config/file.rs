//! TOML file configuration structures.
//!
//! These structs directly map to the `royset-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;
use uuid::Uuid;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub engine: EngineSection,
    pub payout: PayoutSection,
    #[serde(default)]
    pub reconciliation: ReconciliationSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    std::net::SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Mirror database section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Path of the SQLite mirror file.
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    String::from("./royset-mirror.db")
}

fn default_max_connections() -> u32 {
    5
}

/// Engine section: the operator identity and the transfer deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Identity allowed to execute emergency withdrawals.
    pub operator: Uuid,
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
}

fn default_transfer_timeout_secs() -> u64 {
    30
}

/// Outbound payout rail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSection {
    /// Endpoint transfers are POSTed to.
    pub endpoint: Url,
}

/// Reconciliation pipeline knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSection {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_lag_check_secs")]
    pub lag_check_secs: u64,
    /// Lag above this many events is logged at warn level and reported
    /// as lagging by the lag endpoint.
    #[serde(default = "default_lag_warn_threshold")]
    pub lag_warn_threshold: i64,
}

impl Default for ReconciliationSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            lag_check_secs: default_lag_check_secs(),
            lag_warn_threshold: default_lag_warn_threshold(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_lag_check_secs() -> u64 {
    10
}

fn default_lag_warn_threshold() -> i64 {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing_with_defaults() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[database]
path = "/var/lib/royset/mirror.db"

[engine]
operator = "0191e4a0-0000-7000-8000-000000000001"

[payout]
endpoint = "https://payouts.example.com/transfers"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.database.path, "/var/lib/royset/mirror.db");
        assert_eq!(config.engine.transfer_timeout_secs, 30);
        assert_eq!(config.reconciliation.workers, 4);
        assert_eq!(config.reconciliation.lag_warn_threshold, 64);
    }

    #[test]
    fn test_reconciliation_overrides() {
        let toml_str = r#"
[server]

[database]

[engine]
operator = "0191e4a0-0000-7000-8000-000000000001"
transfer_timeout_secs = 5

[payout]
endpoint = "http://localhost:9000/transfers"

[reconciliation]
workers = 2
lag_check_secs = 1
lag_warn_threshold = 10
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.transfer_timeout_secs, 5);
        assert_eq!(config.reconciliation.workers, 2);
        assert_eq!(config.reconciliation.lag_warn_threshold, 10);
    }
}
