//! Bytecode compiler
//!
//! Lowers a type-inferred, optionally fused IR module into an `Executable`:
//! instruction emission, liveness analysis, memory planning and stream
//! assignment, all under one `PassContext`.

use crate::context::PassContext;
use crate::error::{CompileError, Result};
use crate::fuse::FuseOps;
use crate::infer_type::infer_module;
use crate::liveness::{liveness, register_order};
use crate::memory_plan::plan_memory;
use crate::pass::Pass;
use crate::stream::{assign_streams, validate_schedule};
use lantern_core::ir::ops;
use lantern_core::{
    CoreError, Executable, Expr, Instruction, KernelSpec, Module, Reg, StreamId, TensorType,
};
use lantern_core::bytecode::ParamSpec;
use std::collections::BTreeMap;
use std::path::Path;

/// Compilation target, identified by device kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    kind: String,
}

impl Target {
    /// Create a target for a device kind identifier
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    /// Target kind name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether this target has a lowering for `op`
    pub fn supports(&self, op: &str) -> bool {
        // Only the CPU target carries the built-in kernel table; other
        // kinds are opaque and supply nothing.
        self.kind == "cpu" && ops::arity(op).is_some()
    }
}

/// The VM bytecode compiler
pub struct VmCompiler;

impl VmCompiler {
    /// Run the optimization half of the pipeline: type inference, then
    /// fusion per the context, then a lowering-availability check against
    /// `target`. Returns the optimized module without emitting bytecode.
    pub fn optimize(module: &Module, target: &Target, cx: &PassContext) -> Result<Module> {
        let mut module = infer_module(module)?;
        if cx.opt_level >= 1 && cx.fuse_level > 0 {
            module = FuseOps.run(module, cx)?;
        }
        for function in module.functions.values() {
            for binding in &function.bindings {
                if let Expr::Call { ops: chain, .. } = &binding.expr {
                    for op in chain {
                        if !target.supports(op) {
                            return Err(CompileError::Lowering {
                                op: op.clone(),
                                target: target.kind.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(module)
    }

    /// Compile a module for a target into an executable
    pub fn compile(module: &Module, target: &Target, cx: &PassContext) -> Result<Executable> {
        let module = Self::optimize(module, target, cx)?;
        let function = module.main()?;

        let schedule_cache = match &cx.sch_file {
            Some(path) => load_schedule_cache(path)?,
            None => BTreeMap::new(),
        };

        let (order, reg_of) = register_order(function);
        let mut register_types: Vec<TensorType> = Vec::with_capacity(order.len());
        for id in &order {
            let ty = function.type_of(*id).ok_or_else(|| {
                CoreError::TypeError(format!("value {} untyped after inference", id))
            })?;
            register_types.push(ty.clone());
        }

        let streams = assign_streams(function, &cx.stream_policy);

        let mut constants = Vec::new();
        let mut kernels: Vec<KernelSpec> = Vec::new();
        let mut instructions: Vec<Instruction> = Vec::with_capacity(function.bindings.len() + 1);
        for (i, binding) in function.bindings.iter().enumerate() {
            let dst = Reg(reg_of[&binding.id] as u32);
            match &binding.expr {
                Expr::Constant(tensor) => {
                    constants.push(tensor.clone());
                    instructions.push(Instruction::LoadConst {
                        const_index: constants.len() - 1,
                        dst,
                        stream: streams[i],
                    });
                }
                Expr::Call { ops: chain, args } => {
                    let out_ty = register_types[reg_of[&binding.id]].clone();
                    let mut spec = KernelSpec {
                        ops: chain.clone(),
                        variant: "default".to_string(),
                        out_ty,
                    };
                    if let Some(variant) = schedule_cache.get(&spec.chain_name()) {
                        spec.variant = variant.clone();
                    }
                    kernels.push(spec);
                    let arg_regs = args.iter().map(|a| Reg(reg_of[a] as u32)).collect();
                    instructions.push(Instruction::InvokeKernel {
                        kernel: kernels.len() - 1,
                        args: arg_regs,
                        dst,
                        stream: streams[i],
                    });
                }
            }
        }
        instructions.push(Instruction::Ret {
            values: function
                .outputs
                .iter()
                .map(|o| Reg(reg_of[o] as u32))
                .collect(),
        });

        let ranges = liveness(function);
        let memory_plan = plan_memory(function, &ranges, &register_types, cx.reuse_storage);

        let params: Vec<ParamSpec> = function
            .params
            .iter()
            .map(|p| ParamSpec {
                name: p.name.clone(),
                ty: p.ty.clone(),
                reg: Reg(reg_of[&p.id] as u32),
            })
            .collect();
        let param_regs: Vec<Reg> = params.iter().map(|p| p.reg).collect();
        validate_schedule(&instructions, &param_regs)?;

        let num_streams = instructions
            .iter()
            .filter_map(|i| i.stream())
            .map(|s| s.0 + 1)
            .max()
            .unwrap_or(1);

        tracing::debug!(
            instructions = instructions.len(),
            buffers = memory_plan.buffers.len(),
            bytes = memory_plan.total_bytes(),
            num_streams,
            "compiled module"
        );

        Ok(Executable {
            params,
            instructions,
            constants,
            kernels,
            memory_plan,
            register_types,
            num_streams,
        })
    }
}

/// Load a persisted operator schedule cache: a JSON object mapping kernel
/// chain names to implementation variants. A missing entry falls back to
/// `"default"` at lookup time; an unreadable or malformed file is an error.
fn load_schedule_cache(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path).map_err(|e| CompileError::ScheduleCache {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| CompileError::ScheduleCache {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
