//! SDK error type

use thiserror::Error;

/// Error surfaced by the high-level entry points
#[derive(Error, Debug)]
pub enum SdkError {
    /// Core data-model error
    #[error(transparent)]
    Core(#[from] lantern_core::CoreError),

    /// Compilation failure
    #[error(transparent)]
    Compile(#[from] lantern_compiler::CompileError),

    /// Execution failure
    #[error(transparent)]
    Runtime(#[from] lantern_runtime::RuntimeError),

    /// Parameter registry lookup miss
    #[error("Parameter not found: '{path}'")]
    NotFound {
        /// Dotted path that failed to resolve
        path: String,
    },

    /// Caller-supplied arguments do not match the model
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
