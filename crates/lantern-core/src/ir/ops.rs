//! Operator registry: shape and dtype rules
//!
//! Operator *semantics* live in device backends; this registry only knows
//! how each operator maps operand types to a result type, which is all the
//! compiler needs for type inference, fusion legality and memory planning.

use crate::error::{CoreError, Result};
use crate::tensor::TensorType;

/// Binary elementwise operators: identical operand types required
pub const BINARY_ELEMENTWISE: &[&str] = &["add", "subtract", "multiply", "divide", "maximum"];

/// Unary elementwise operators: operand type passes through
pub const UNARY_ELEMENTWISE: &[&str] = &["relu", "negate", "sigmoid", "tanh"];

/// Every operator known to the registry
pub fn all_ops() -> Vec<&'static str> {
    let mut ops: Vec<&'static str> = Vec::new();
    ops.extend_from_slice(BINARY_ELEMENTWISE);
    ops.extend_from_slice(UNARY_ELEMENTWISE);
    ops.push("matmul");
    ops
}

/// Whether `op` is a unary elementwise operator (fusable as an epilogue)
pub fn is_unary_elementwise(op: &str) -> bool {
    UNARY_ELEMENTWISE.contains(&op)
}

/// Declared arity of `op`, if known
pub fn arity(op: &str) -> Option<usize> {
    if BINARY_ELEMENTWISE.contains(&op) || op == "matmul" {
        Some(2)
    } else if UNARY_ELEMENTWISE.contains(&op) {
        Some(1)
    } else {
        None
    }
}

/// Infer the result type of a single operator applied to resolved operand
/// types. Fails with `TypeError` on unknown operators, wrong arity or
/// inconsistent operand types.
pub fn infer_call(op: &str, args: &[&TensorType]) -> Result<TensorType> {
    let expected = arity(op)
        .ok_or_else(|| CoreError::TypeError(format!("unknown operator '{}'", op)))?;
    if args.len() != expected {
        return Err(CoreError::TypeError(format!(
            "operator '{}' expects {} operands, got {}",
            op,
            expected,
            args.len()
        )));
    }

    if BINARY_ELEMENTWISE.contains(&op) {
        let (a, b) = (args[0], args[1]);
        if a != b {
            return Err(CoreError::TypeError(format!(
                "operator '{}' requires identical operand types, got {} and {}",
                op, a, b
            )));
        }
        return Ok(a.clone());
    }

    if UNARY_ELEMENTWISE.contains(&op) {
        return Ok(args[0].clone());
    }

    // matmul: (m,k) x (k,n) -> (m,n)
    let (a, b) = (args[0], args[1]);
    if a.rank() != 2 || b.rank() != 2 {
        return Err(CoreError::TypeError(format!(
            "matmul requires rank-2 operands, got {} and {}",
            a, b
        )));
    }
    if a.dtype != b.dtype {
        return Err(CoreError::TypeError(format!(
            "matmul operand dtypes differ: {} vs {}",
            a.dtype, b.dtype
        )));
    }
    if a.shape[1] != b.shape[0] {
        return Err(CoreError::TypeError(format!(
            "matmul inner dimensions differ: {} vs {}",
            a, b
        )));
    }
    Ok(TensorType::new(vec![a.shape[0], b.shape[1]], a.dtype))
}
