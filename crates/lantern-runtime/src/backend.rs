//! Device backend trait and reference CPU backend
//!
//! The executor is backend-agnostic: it hands each instruction's kernel,
//! input views and output slice to a `DeviceBackend`. The CPU backend here
//! is interpreter-grade, enough to run compiled modules on host memory;
//! real accelerators plug in behind the same trait.

use crate::device::DeviceKind;
use crate::error::{Result, RuntimeError};
use lantern_core::{KernelSpec, StreamId, TensorType};

/// Borrowed view of one tensor argument
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    /// Static type of the viewed value
    pub ty: &'a TensorType,

    /// Element data
    pub data: &'a [f64],
}

/// A device capable of executing lowered kernels
pub trait DeviceBackend {
    /// Kind of device this backend drives
    fn kind(&self) -> DeviceKind;

    /// Execute one kernel (a primary operator plus fused unary epilogues)
    /// on the given stream, writing the result into `out`.
    fn launch(
        &self,
        kernel: &KernelSpec,
        inputs: &[TensorView<'_>],
        out: &mut [f64],
        stream: StreamId,
    ) -> Result<()>;
}

/// Reference host backend
#[derive(Debug)]
pub struct CpuBackend;

impl DeviceBackend for CpuBackend {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn launch(
        &self,
        kernel: &KernelSpec,
        inputs: &[TensorView<'_>],
        out: &mut [f64],
        stream: StreamId,
    ) -> Result<()> {
        tracing::trace!(kernel = %kernel.chain_name(), stream = stream.0, "launch");
        let primary = kernel
            .ops
            .first()
            .ok_or_else(|| RuntimeError::Backend("kernel has an empty operator chain".to_string()))?;
        if let Some(f) = binary_fn(primary) {
            let (a, b) = two_inputs(primary, inputs)?;
            check_out(primary, out, a.data.len())?;
            for i in 0..out.len() {
                out[i] = f(a.data[i], b.data[i]);
            }
        } else if let Some(f) = unary_fn(primary) {
            let a = one_input(primary, inputs)?;
            check_out(primary, out, a.data.len())?;
            for i in 0..out.len() {
                out[i] = f(a.data[i]);
            }
        } else if primary == "matmul" {
            let (a, b) = two_inputs(primary, inputs)?;
            let (m, k) = (a.ty.shape[0], a.ty.shape[1]);
            let n = b.ty.shape[1];
            check_out(primary, out, m * n)?;
            for i in 0..m {
                for j in 0..n {
                    let mut acc = 0.0;
                    for l in 0..k {
                        acc += a.data[i * k + l] * b.data[l * n + j];
                    }
                    out[i * n + j] = acc;
                }
            }
        } else {
            return Err(RuntimeError::UnsupportedOp(primary.clone()));
        }

        for epilogue in &kernel.ops[1..] {
            let f = unary_fn(epilogue)
                .ok_or_else(|| RuntimeError::UnsupportedOp(epilogue.clone()))?;
            for v in out.iter_mut() {
                *v = f(*v);
            }
        }
        Ok(())
    }
}

fn binary_fn(op: &str) -> Option<fn(f64, f64) -> f64> {
    match op {
        "add" => Some(|a, b| a + b),
        "subtract" => Some(|a, b| a - b),
        "multiply" => Some(|a, b| a * b),
        "divide" => Some(|a, b| a / b),
        "maximum" => Some(f64::max),
        _ => None,
    }
}

fn unary_fn(op: &str) -> Option<fn(f64) -> f64> {
    match op {
        "relu" => Some(|x| x.max(0.0)),
        "negate" => Some(|x| -x),
        "sigmoid" => Some(|x| 1.0 / (1.0 + (-x).exp())),
        "tanh" => Some(f64::tanh),
        _ => None,
    }
}

fn one_input<'a>(op: &str, inputs: &[TensorView<'a>]) -> Result<TensorView<'a>> {
    if inputs.len() != 1 {
        return Err(RuntimeError::Backend(format!(
            "operator '{}' expects 1 input, got {}",
            op,
            inputs.len()
        )));
    }
    Ok(inputs[0])
}

fn two_inputs<'a>(op: &str, inputs: &[TensorView<'a>]) -> Result<(TensorView<'a>, TensorView<'a>)> {
    if inputs.len() != 2 {
        return Err(RuntimeError::Backend(format!(
            "operator '{}' expects 2 inputs, got {}",
            op,
            inputs.len()
        )));
    }
    Ok((inputs[0], inputs[1]))
}

fn check_out(op: &str, out: &[f64], expected: usize) -> Result<()> {
    if out.len() != expected {
        return Err(RuntimeError::Backend(format!(
            "operator '{}' output has {} elements, expected {}",
            op,
            out.len(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::DType;

    fn ty(shape: Vec<usize>) -> TensorType {
        TensorType::new(shape, DType::F32)
    }

    fn kernel(ops: &[&str], out_shape: Vec<usize>) -> KernelSpec {
        KernelSpec {
            ops: ops.iter().map(|s| s.to_string()).collect(),
            variant: "default".to_string(),
            out_ty: ty(out_shape),
        }
    }

    #[test]
    fn test_elementwise_add() {
        let t = ty(vec![4]);
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [10.0, 20.0, 30.0, 40.0];
        let mut out = [0.0; 4];
        CpuBackend
            .launch(
                &kernel(&["add"], vec![4]),
                &[
                    TensorView { ty: &t, data: &a },
                    TensorView { ty: &t, data: &b },
                ],
                &mut out,
                StreamId(0),
            )
            .unwrap();
        assert_eq!(out, [11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_matmul() {
        let at = ty(vec![2, 2]);
        let bt = ty(vec![2, 2]);
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let mut out = [0.0; 4];
        CpuBackend
            .launch(
                &kernel(&["matmul"], vec![2, 2]),
                &[
                    TensorView { ty: &at, data: &a },
                    TensorView { ty: &bt, data: &b },
                ],
                &mut out,
                StreamId(0),
            )
            .unwrap();
        assert_eq!(out, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_fused_epilogue() {
        let t = ty(vec![2]);
        let a = [1.0, -3.0];
        let b = [-2.0, 1.0];
        let mut out = [0.0; 2];
        CpuBackend
            .launch(
                &kernel(&["add", "relu"], vec![2]),
                &[
                    TensorView { ty: &t, data: &a },
                    TensorView { ty: &t, data: &b },
                ],
                &mut out,
                StreamId(0),
            )
            .unwrap();
        // add gives [-1, -2]; relu clamps to zero.
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn test_unsupported_op() {
        let t = ty(vec![1]);
        let a = [1.0];
        let mut out = [0.0];
        let err = CpuBackend
            .launch(
                &kernel(&["conv2d"], vec![1]),
                &[TensorView { ty: &t, data: &a }],
                &mut out,
                StreamId(0),
            )
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedOp(_)));
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let t = ty(vec![1]);
        let a = [1.0];
        let mut out = [0.0];
        let err = CpuBackend
            .launch(
                &kernel(&[], vec![1]),
                &[TensorView { ty: &t, data: &a }],
                &mut out,
                StreamId(0),
            )
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Backend(_)));
    }

    #[test]
    fn test_unary_chain() {
        let t = ty(vec![2]);
        let a = [2.0, -2.0];
        let mut out = [0.0; 2];
        CpuBackend
            .launch(
                &kernel(&["negate"], vec![2]),
                &[TensorView { ty: &t, data: &a }],
                &mut out,
                StreamId(0),
            )
            .unwrap();
        assert_eq!(out, [-2.0, 2.0]);
    }
}
