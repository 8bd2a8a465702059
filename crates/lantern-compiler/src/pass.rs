//! Pass trait and pass manager
//!
//! A pass is a module-to-module transformation. The manager applies an
//! ordered list of passes under one read-only context; a failure aborts the
//! remaining sequence and the caller never sees a partially-transformed
//! module.

use crate::context::PassContext;
use crate::error::{CompileError, Result};
use lantern_core::Module;

/// An IR-to-IR transformation
pub trait Pass {
    /// Stable pass name, used in diagnostics
    fn name(&self) -> &str;

    /// Apply the pass, producing a new module
    fn run(&self, module: Module, cx: &PassContext) -> Result<Module>;
}

/// Runs an ordered pass sequence
pub struct PassManager;

impl PassManager {
    /// Apply `passes` strictly in list order, threading the module through.
    /// An empty list returns the input unchanged. A pass failure is wrapped
    /// with the index and name of the failing pass.
    pub fn run(module: Module, cx: &PassContext, passes: &[Box<dyn Pass>]) -> Result<Module> {
        let mut module = module;
        for (index, pass) in passes.iter().enumerate() {
            tracing::debug!(pass = pass.name(), index, "running pass");
            module = pass
                .run(module, cx)
                .map_err(|source| CompileError::PassFailed {
                    index,
                    pass: pass.name().to_string(),
                    source: Box::new(source),
                })?;
        }
        Ok(module)
    }
}
