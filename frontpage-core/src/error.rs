//! Error types for the similarity and clustering engine

use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum FrontpageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown clustering algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl FrontpageError {
    pub fn config(msg: impl Into<String>) -> Self {
        FrontpageError::Config(msg.into())
    }

    pub fn unknown_algorithm(name: impl Into<String>) -> Self {
        FrontpageError::UnknownAlgorithm(name.into())
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        FrontpageError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by caller-supplied configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            FrontpageError::Config(_)
                | FrontpageError::UnknownAlgorithm(_)
                | FrontpageError::InvalidParameter { .. }
        )
    }
}

/// Result type alias for engine operations
pub type FrontpageResult<T> = Result<T, FrontpageError>;
