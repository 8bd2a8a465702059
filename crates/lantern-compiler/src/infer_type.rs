//! Type inference pass
//!
//! Annotates every value with a resolved shape and dtype by a single
//! forward walk. Deterministic given the same untyped input, so re-running
//! on an already-typed module reproduces identical annotations.

use crate::context::PassContext;
use crate::error::Result;
use crate::pass::Pass;
use lantern_core::ir::ops;
use lantern_core::{Binding, CoreError, Expr, Function, Module, TensorType, ValueId};
use std::collections::HashMap;

/// The type inference pass
pub struct InferType;

impl Pass for InferType {
    fn name(&self) -> &str {
        "infer_type"
    }

    fn run(&self, module: Module, _cx: &PassContext) -> Result<Module> {
        infer_module(&module)
    }
}

/// Infer types for every function of a module
pub fn infer_module(module: &Module) -> Result<Module> {
    let mut out = Module::new();
    for (name, function) in &module.functions {
        out.insert(name.clone(), infer_function(function)?);
    }
    Ok(out)
}

/// Infer types for a single function
pub fn infer_function(function: &Function) -> Result<Function> {
    let mut env: HashMap<ValueId, TensorType> = HashMap::new();
    for param in &function.params {
        env.insert(param.id, param.ty.clone());
    }

    let mut bindings = Vec::with_capacity(function.bindings.len());
    for binding in &function.bindings {
        let ty = match &binding.expr {
            Expr::Constant(tensor) => tensor.ty.clone(),
            Expr::Call { ops: chain, args } => {
                let primary = chain.first().ok_or_else(|| {
                    CoreError::TypeError(format!("value {} has an empty operator chain", binding.id))
                })?;
                let mut arg_tys = Vec::with_capacity(args.len());
                for arg in args {
                    let ty = env.get(arg).ok_or_else(|| {
                        CoreError::TypeError(format!("unbound value {} in call", arg))
                    })?;
                    arg_tys.push(ty);
                }
                // Primary operator first, then each fused epilogue over its
                // running result.
                let mut ty = ops::infer_call(primary, &arg_tys)?;
                for epilogue in &chain[1..] {
                    ty = ops::infer_call(epilogue, &[&ty])?;
                }
                ty
            }
        };
        env.insert(binding.id, ty.clone());
        bindings.push(Binding {
            id: binding.id,
            expr: binding.expr.clone(),
            ty: Some(ty),
        });
    }

    for output in &function.outputs {
        if !env.contains_key(output) {
            return Err(CoreError::TypeError(format!("unbound output {}", output)).into());
        }
    }

    Ok(Function {
        params: function.params.clone(),
        bindings,
        outputs: function.outputs.clone(),
    })
}
