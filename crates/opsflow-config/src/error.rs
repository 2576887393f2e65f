use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Config file not found. Checked:\n\
        - current directory: opsflow.local.yaml, opsflow.yaml\n\
        - ./.opsflow/ directory\n\
        - ~/.config/opsflow/config.yaml\n\
        Set OPSFLOW_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid retry settings: {0}")]
    InvalidRetry(String),

    #[error("Invalid log filter '{filter}': {message}")]
    InvalidLogFilter { filter: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
