//! Service configuration
//!
//! Settings are layered: struct defaults, then `config/fetchdeck.toml` (or
//! the file named by `FETCHDECK_CONFIG`), then environment variables of the
//! form `FETCHDECK__<section>__<key>`:
//!
//! ```text
//! FETCHDECK__SERVER__BIND_ADDR=0.0.0.0:9999
//! FETCHDECK__ENGINE__MAX_RUNNING=3
//! FETCHDECK__SERVER__API__MAX_BODY_BYTES=2MB
//! ```
//!
//! `FETCHDECK_API_TOKEN` enables token checks on `/api/v1`. It is never read
//! from the file.
//!
//! ```no_run
//! use fetchdeck::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("ledger at {}", config.ledger_path().display());
//! ```

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{ApiLimits, Config, EngineConfig, ExtensionsConfig, RelayConfig, ServerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load and validate configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Same as [`Config::load`] but for an explicit file, without secrets
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Where the ledger keyspace lives
    pub fn ledger_path(&self) -> std::path::PathBuf {
        self.server.data_dir.join("ledger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[engine]\nmax_running = 2\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.engine.max_running, 2);
        assert_eq!(config.ledger_path(), std::path::PathBuf::from("data/ledger"));
    }

    #[test]
    fn test_validation_catches_zero_max_running() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[engine]\nmax_running = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidMaxRunning)
        ));
    }

    #[test]
    fn test_malformed_file_is_a_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[server]\nbind_addr = \"not-an-address\"\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::LoadError(_)));
    }
}
