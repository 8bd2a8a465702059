//! IR definitions
//!
//! The IR is a let-bound computation graph: a `Function` is an ordered list
//! of bindings, each producing one tensor value from an operator call or a
//! constant. A `Module` is a set of named functions with a `"main"` entry.

pub mod expr;
pub mod module;
pub mod ops;

// Re-export for convenience
pub use expr::{Binding, Expr, Function, FunctionBuilder, Param, ValueId};
pub use module::Module;
