//! tracing subscriber setup

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"opsflow_layers=debug,info"`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// `RUST_LOG` wins over the configured filter
    pub fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter).map_err(|e| ConfigError::InvalidLogFilter {
            filter: self.filter.clone(),
            message: e.to_string(),
        })
    }
}

/// Install a global fmt subscriber. A subscriber installed earlier (by the
/// host or another test) is left in place.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    if !installed {
        tracing::debug!("tracing subscriber already installed, keeping it");
    }
    Ok(())
}
