//! Compiler error types

use lantern_core::CoreError;
use thiserror::Error;

/// Compiler error
#[derive(Error, Debug)]
pub enum CompileError {
    /// Type inference or name resolution failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A pass in a managed sequence failed
    #[error("pass '{pass}' (index {index}) failed: {source}")]
    PassFailed {
        /// Position in the pass list
        index: usize,
        /// Name of the failing pass
        pass: String,
        /// Underlying error
        #[source]
        source: Box<CompileError>,
    },

    /// No lowering available for an operator on the requested target
    #[error("no lowering for operator '{op}' on target '{target}'")]
    Lowering {
        /// Operator name
        op: String,
        /// Target kind
        target: String,
    },

    /// Dependency-violating schedule; internal invariant, fatal
    #[error("scheduling invariant violated: {0}")]
    Scheduling(String),

    /// Unrecognized configuration value
    #[error("unknown value '{value}' for option '{key}'")]
    UnknownOption {
        /// Option name
        key: String,
        /// Rejected value
        value: String,
    },

    /// Operator schedule cache could not be read or parsed
    #[error("schedule cache '{path}': {message}")]
    ScheduleCache {
        /// File path
        path: String,
        /// Failure description
        message: String,
    },
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;
