//! Lantern SDK - high-level compile and execution entry points
//!
//! Wires the pipeline end to end: a `Model` (IR module plus parameter
//! registry) goes through type inference, any caller-supplied passes, the
//! bytecode compiler, and finally a VM executor bound to the requested
//! device.

pub mod error;
pub mod model;
pub mod options;
pub mod params;

pub use error::{Result, SdkError};
pub use model::Model;
pub use options::CompileOptions;
pub use params::{ParamPath, ParamTree, Selector};

use lantern_compiler::{infer_module, PassManager, Target, VmCompiler};
use lantern_core::{Executable, Function, Tensor};
use lantern_runtime::{CpuBackend, Device, VmExecutor};

/// Compile `model` for `device` and bind a ready executor.
///
/// Runs type inference, then `options.pass_seq` in order, then the bytecode
/// compiler. Returns the executor together with the prepared input list
/// (caller `args` followed by registered parameters) for the first
/// invocation.
pub fn compile_model(
    model: &Model,
    device: Device,
    args: &[Tensor],
    options: &CompileOptions,
) -> Result<(VmExecutor<CpuBackend>, Vec<Tensor>)> {
    let inputs = model.prepared_inputs(args)?;
    let cx = options.to_context()?;
    let module = infer_module(model.module())?;
    let module = PassManager::run(module, &cx, &options.pass_seq)?;
    let target = Target::new(device.kind.name());
    let executable = VmCompiler::compile(&module, &target, &cx)?;
    tracing::debug!(device = %device, params = executable.param_count(), "model compiled");
    let executor = VmExecutor::new(executable, device, CpuBackend)?;
    Ok((executor, inputs))
}

/// Compile `model` to a raw executable with default options, for
/// inspection or serialization. `args` are validated against the model but
/// not embedded.
pub fn compile_bytecode(model: &Model, device: Device, args: &[Tensor]) -> Result<Executable> {
    model.prepared_inputs(args)?;
    let options = CompileOptions::default();
    let cx = options.to_context()?;
    let target = Target::new(device.kind.name());
    Ok(VmCompiler::compile(model.module(), &target, &cx)?)
}

/// Run the optimization half of the pipeline and return the optimized
/// `"main"` function, without emitting bytecode or binding a device.
pub fn lower_model(model: &Model, target: &Target, args: &[Tensor]) -> Result<Function> {
    model.prepared_inputs(args)?;
    let cx = CompileOptions::default().to_context()?;
    let module = VmCompiler::optimize(model.module(), target, &cx)?;
    Ok(module.main()?.clone())
}
