//! Runtime error types

use thiserror::Error;

/// Runtime error
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Argument count or type mismatch at call time; surfaced before any
    /// device work is dispatched
    #[error("Invocation error: {0}")]
    Invocation(String),

    /// Use after release
    #[error("Executor is closed")]
    ClosedExecutor,

    /// Backend has no kernel for an operator
    #[error("Unsupported operator '{0}' on this backend")]
    UnsupportedOp(String),

    /// Backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// A register was read before being written; internal invariant breach
    #[error("Dependency violation at pc {pc}: register r{reg} read before write")]
    DependencyViolation {
        /// Instruction index
        pc: usize,
        /// Offending register
        reg: u32,
    },
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
