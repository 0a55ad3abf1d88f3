//! YAML Configuration
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```yaml
//! data:
//!   directory: data
//! defaults:
//!   ticker: AAPL
//!   period: max
//! simulation:
//!   days: 30
//!   trials: 100
//!   seed: 42
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::buckets::DEFAULT_BUCKETS;
use crate::calendar::Period;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub defaults: DefaultsConfig,
    pub simulation: SimulationConfig,
    pub buckets: BucketConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Where price history files live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `<TICKER>.csv` files
    pub directory: PathBuf,
}

/// Ticker and period used when a request leaves them out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub ticker: String,
    pub period: Period,
}

/// Monte Carlo parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Trading days to simulate ahead
    pub days: usize,
    /// Number of independent paths
    pub trials: usize,
    /// Fixed seed for reproducible runs; a fresh entropy seed per run when absent
    pub seed: Option<u64>,
    /// Upper bound on trials a request may ask for
    pub max_trials: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub count: usize,
}

/// Dashboard server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/ui`
    pub ui_directory: PathBuf,
    /// Entries kept in each in-memory result cache
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            period: Period::Max,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days: 30,
            trials: 100,
            seed: None,
            max_trials: 10_000,
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_BUCKETS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8062,
            ui_directory: PathBuf::from("ui"),
            cache_capacity: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upper bound on simulated days
pub const MAX_SIMULATION_DAYS: usize = 10_000;

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.days == 0 || self.simulation.days > MAX_SIMULATION_DAYS {
            return Err(ConfigError::Validation(format!(
                "simulation days must be between 1 and {}",
                MAX_SIMULATION_DAYS
            )));
        }

        if self.simulation.max_trials == 0 {
            return Err(ConfigError::Validation(
                "simulation max_trials must be positive".to_string(),
            ));
        }

        if self.simulation.trials == 0 || self.simulation.trials > self.simulation.max_trials {
            return Err(ConfigError::Validation(format!(
                "simulation trials must be between 1 and {}",
                self.simulation.max_trials
            )));
        }

        if self.buckets.count == 0 {
            return Err(ConfigError::Validation(
                "bucket count must be at least 1".to_string(),
            ));
        }

        if self.defaults.ticker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default ticker must not be empty".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server port must not be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.simulation.days, 30);
        assert_eq!(config.simulation.trials, 100);
        assert_eq!(config.buckets.count, 20);
        assert_eq!(config.defaults.period, Period::Max);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = Config::from_yaml(
            "defaults:\n  ticker: MSFT\n  period: 6mo\nsimulation:\n  seed: 42\n",
        )
        .unwrap();
        assert_eq!(config.defaults.ticker, "MSFT");
        assert_eq!(config.defaults.period, Period::SixMonths);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.days, 30);
        assert_eq!(config.server.port, 8062);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.simulation.trials = 20_000;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.buckets.count = 0;
        assert!(config.validate().is_err());

        assert!(Config::from_yaml("simulation:\n  days: 0\n").is_err());
    }

    #[test]
    fn test_unknown_period_is_parse_error() {
        let err = Config::from_yaml("defaults:\n  period: 2w\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_shipped_dashboard_config() {
        let config = Config::from_file("config/dashboard.yaml").unwrap();
        assert_eq!(config.defaults.ticker, "DEMO");
        assert_eq!(config.defaults.period, Period::OneYear);
        assert_eq!(config.simulation.seed, None);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.simulation.seed = Some(7);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
