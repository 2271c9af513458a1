//! Configuration module for royset-server.
//!
//! Handles loading configuration from the TOML file plus CLI overrides,
//! and validating it before anything is wired up.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::RuntimeConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub file: FileConfig,
}

impl LoadedConfig {
    pub fn listen(&self) -> SocketAddr {
        self.file.server.listen
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.file.engine.transfer_timeout_secs)
    }

    pub fn lag_check_interval(&self) -> Duration {
        Duration::from_secs(self.file.reconciliation.lag_check_secs)
    }

    /// The reloadable subset of the configuration.
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            lag_warn_threshold: self.file.reconciliation.lag_warn_threshold,
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides, and validate.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file.server.listen = listen;
        }

        self.validate(&file)?;
        Ok(LoadedConfig { file })
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.engine.operator.is_nil() {
            return Err(ConfigError::ValidationError(String::from(
                "engine.operator must not be the nil identity",
            )));
        }
        if config.engine.transfer_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(String::from(
                "engine.transfer_timeout_secs must be at least 1",
            )));
        }
        if config.reconciliation.workers == 0 {
            return Err(ConfigError::ValidationError(String::from(
                "reconciliation.workers must be at least 1",
            )));
        }
        Ok(())
    }
}
