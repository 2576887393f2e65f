//! Remote API error types

use thiserror::Error;

/// Errors surfaced by the remote orchestration API and its collaborators
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Too many results: expected 1, got {count} ({request})")]
    TooManyResults { count: usize, request: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// The remote object (or sub-resource) does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ResourceNotFound(_))
    }

    /// Network, throttling and timeout failures that may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, CloudError::ApiError(_) | CloudError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
