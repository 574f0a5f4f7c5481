//! Error types for autotrade-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid trading settings: {0}")]
    InvalidSettings(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
