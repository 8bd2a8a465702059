//! Lantern Core - Core types for the Lantern tensor-compilation pipeline
//!
//! This crate provides the fundamental types shared across the Lantern
//! workspace:
//! - Tensor values and tensor types
//! - IR (Intermediate Representation) definitions
//! - The compiled executable/bytecode format
//! - Error types

pub mod bytecode;
pub mod error;
pub mod ir;
pub mod tensor;

// Re-export commonly used types
pub use bytecode::{
    BufferId, BufferSpec, Executable, Instruction, KernelSpec, MemoryPlan, ParamSpec, Reg,
    StreamId,
};
pub use error::CoreError;
pub use ir::{Binding, Expr, Function, FunctionBuilder, Module, Param, ValueId};
pub use tensor::{DType, Tensor, TensorType};
