//! Error types for Lantern Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Shape or dtype inconsistency
    #[error("Type error: {0}")]
    TypeError(String),

    /// Unresolved name lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed value
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
