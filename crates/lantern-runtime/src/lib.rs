//! Lantern Runtime - VM executor for compiled executables
//!
//! This crate binds an `Executable` to a device: it allocates buffers per
//! the memory plan, dispatches instructions in stream order through a
//! backend, and returns output tensors.

pub mod backend;
pub mod device;
pub mod error;
pub mod vm;

// Re-export main types
pub use backend::{CpuBackend, DeviceBackend, TensorView};
pub use device::{Device, DeviceKind};
pub use error::{Result, RuntimeError};
pub use vm::{ExecutorState, VmExecutor};
