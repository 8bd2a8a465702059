//! Operator fusion pass
//!
//! Folds unary elementwise calls into their producing call as epilogues, so
//! the chain executes as one dispatch and its intermediates never reach
//! memory planning. The scan is greedy in program order: the earliest open
//! chain is always extended first, which is the deterministic tie-break and
//! also minimizes surviving intermediate values.

use crate::context::PassContext;
use crate::error::Result;
use crate::pass::Pass;
use lantern_core::ir::ops;
use lantern_core::{Binding, Expr, Function, Module, ValueId};
use std::collections::{HashMap, HashSet};

/// The fusion pass; `fuse_level` caps epilogues per chain, 0 disables
pub struct FuseOps;

impl Pass for FuseOps {
    fn name(&self) -> &str {
        "fuse_ops"
    }

    fn run(&self, module: Module, cx: &PassContext) -> Result<Module> {
        if cx.fuse_level == 0 {
            return Ok(module);
        }
        let mut out = Module::new();
        for (name, function) in &module.functions {
            out.insert(name.clone(), fuse_function(function, cx.fuse_level));
        }
        Ok(out)
    }
}

/// Fuse one function with at most `max_epilogues` epilogues per chain
pub fn fuse_function(function: &Function, max_epilogues: u32) -> Function {
    let mut uses: HashMap<ValueId, usize> = HashMap::new();
    for binding in &function.bindings {
        for arg in binding.expr.args() {
            *uses.entry(*arg).or_insert(0) += 1;
        }
    }
    let outputs: HashSet<ValueId> = function.outputs.iter().copied().collect();

    let mut fused: Vec<Binding> = Vec::with_capacity(function.bindings.len());
    for binding in &function.bindings {
        let epilogue = fusable_epilogue(binding, fused.last(), &uses, &outputs, max_epilogues);
        match (epilogue, fused.pop()) {
            (
                Some(epilogue),
                Some(Binding {
                    expr: Expr::Call { ops: mut chain, args },
                    ..
                }),
            ) => {
                chain.push(epilogue);
                fused.push(Binding {
                    id: binding.id,
                    expr: Expr::Call { ops: chain, args },
                    ty: binding.ty.clone(),
                });
            }
            (_, prev) => {
                if let Some(prev) = prev {
                    fused.push(prev);
                }
                fused.push(binding.clone());
            }
        }
    }

    Function {
        params: function.params.clone(),
        bindings: fused,
        outputs: function.outputs.clone(),
    }
}

/// If `binding` can fold into the immediately preceding retained binding,
/// return the epilogue operator name to append to its chain.
fn fusable_epilogue(
    binding: &Binding,
    prev: Option<&Binding>,
    uses: &HashMap<ValueId, usize>,
    outputs: &HashSet<ValueId>,
    max_epilogues: u32,
) -> Option<String> {
    let (chain, args) = match &binding.expr {
        Expr::Call { ops: chain, args } => (chain, args),
        Expr::Constant(_) => return None,
    };
    if chain.len() != 1 || args.len() != 1 || !ops::is_unary_elementwise(&chain[0]) {
        return None;
    }
    let producer = args[0];
    let prev = prev?;
    if prev.id != producer {
        return None;
    }
    let prev_chain = match &prev.expr {
        Expr::Call { ops: chain, .. } => chain,
        Expr::Constant(_) => return None,
    };
    // The producer value must vanish entirely: single consumer, not an
    // output, and the chain must have room under the configured cap.
    if outputs.contains(&producer) || uses.get(&producer) != Some(&1) {
        return None;
    }
    if prev_chain.len() as u32 > max_epilogues {
        return None;
    }
    Some(chain[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::ir::FunctionBuilder;
    use lantern_core::{DType, TensorType};

    fn ty(shape: Vec<usize>) -> TensorType {
        TensorType::new(shape, DType::F32)
    }

    fn chain_function() -> Function {
        // y = add(x, x); z = relu(y); w = negate(z)
        let mut b = FunctionBuilder::new();
        let x = b.param("x", ty(vec![4]));
        let y = b.call("add", &[x, x]);
        let z = b.call("relu", &[y]);
        let w = b.call("negate", &[z]);
        b.output(w);
        b.finish()
    }

    fn ops_of(f: &Function, idx: usize) -> Vec<String> {
        match &f.bindings[idx].expr {
            Expr::Call { ops: chain, .. } => chain.clone(),
            Expr::Constant(_) => panic!("expected call"),
        }
    }

    #[test]
    fn test_level_two_fuses_whole_chain() {
        let fused = fuse_function(&chain_function(), 2);
        assert_eq!(fused.bindings.len(), 1);
        assert_eq!(ops_of(&fused, 0), vec!["add", "relu", "negate"]);
        // The surviving binding carries the final value id.
        assert_eq!(fused.bindings[0].id, fused.outputs[0]);
    }

    #[test]
    fn test_level_one_caps_epilogues() {
        let fused = fuse_function(&chain_function(), 1);
        assert_eq!(fused.bindings.len(), 2);
        assert_eq!(ops_of(&fused, 0), vec!["add", "relu"]);
        assert_eq!(ops_of(&fused, 1), vec!["negate"]);
    }

    #[test]
    fn test_multi_consumer_blocks_fusion() {
        // y feeds both relu and the output list.
        let mut b = FunctionBuilder::new();
        let x = b.param("x", ty(vec![4]));
        let y = b.call("add", &[x, x]);
        let z = b.call("relu", &[y]);
        b.output(y);
        b.output(z);
        let fused = fuse_function(&b.finish(), 3);
        assert_eq!(fused.bindings.len(), 2);
    }

    #[test]
    fn test_two_readers_block_fusion() {
        let mut b = FunctionBuilder::new();
        let x = b.param("x", ty(vec![4]));
        let y = b.call("add", &[x, x]);
        let z = b.call("relu", &[y]);
        let w = b.call("multiply", &[y, z]);
        b.output(w);
        let fused = fuse_function(&b.finish(), 3);
        assert_eq!(fused.bindings.len(), 3);
    }

    #[test]
    fn test_binary_op_is_not_an_epilogue() {
        let mut b = FunctionBuilder::new();
        let x = b.param("x", ty(vec![4]));
        let y = b.call("relu", &[x]);
        let z = b.call("add", &[y, y]);
        b.output(z);
        let fused = fuse_function(&b.finish(), 3);
        assert_eq!(fused.bindings.len(), 2);
    }

    #[test]
    fn test_pass_is_noop_at_level_zero() {
        let module = Module::from_function(chain_function());
        let cx = PassContext::default().with_fuse_level(0);
        let out = FuseOps.run(module.clone(), &cx).unwrap();
        assert_eq!(out, module);
    }
}
