//! Lantern Compiler - IR passes and bytecode lowering
//!
//! This crate transforms a typed IR module through a configurable pass
//! sequence and lowers the result to an executable: type inference,
//! operator fusion, liveness analysis, memory planning, stream scheduling
//! and final instruction emission.

pub mod compile;
pub mod context;
pub mod error;
pub mod fuse;
pub mod infer_type;
pub mod liveness;
pub mod memory_plan;
pub mod pass;
pub mod stream;

// Re-export main types
pub use compile::{Target, VmCompiler};
pub use context::{PassContext, StreamPolicy};
pub use error::{CompileError, Result};
pub use fuse::FuseOps;
pub use infer_type::{infer_function, infer_module, InferType};
pub use liveness::{liveness, register_order, LiveRange};
pub use memory_plan::plan_memory;
pub use pass::{Pass, PassManager};
pub use stream::{assign_streams, validate_schedule};
