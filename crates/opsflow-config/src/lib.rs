pub mod error;
pub mod logging;

pub use error::*;
pub use logging::{LoggingConfig, init_tracing};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "OPSFLOW_CONFIG_PATH";
const CANDIDATES: [&str; 2] = ["opsflow.local.yaml", "opsflow.yaml"];

/// Connector configuration
///
/// ```yaml
/// retry:
///   max_attempts: 5
///   initial_delay_ms: 500
/// logging:
///   filter: "opsflow_layers=debug,info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub retry: RetrySettings,
    pub logging: LoggingConfig,
}

/// Backoff settings for remote calls the engine retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidRetry(format!(
                "backoff_multiplier must be a finite number >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidRetry(format!(
                "initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

impl ConnectorConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = parse(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config = parse(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()
    }

    /// Discover and load the config file, falling back to defaults when none exists
    pub fn discover() -> Result<Self> {
        match find_config_file() {
            Ok(path) => {
                tracing::debug!("Loading connector config from {}", path.display());
                Self::load(path)
            }
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("No connector config found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }
}

fn parse(content: &str) -> std::result::Result<ConnectorConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(ConnectorConfig::default());
    }
    serde_yaml::from_str(content)
}

/// OpsFlow config directory (`<config_dir>/opsflow`)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("opsflow");

    Ok(config_dir)
}

/// Find the connector config file
///
/// Search order:
/// 1. `OPSFLOW_CONFIG_PATH` environment variable
/// 2. current directory: opsflow.local.yaml, opsflow.yaml
/// 3. `./.opsflow/` with the same names
/// 4. `~/.config/opsflow/config.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".opsflow");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
