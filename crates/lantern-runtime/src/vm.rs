//! VM executor
//!
//! Binds one executable to one device. All buffers are allocated eagerly
//! when the executor is created, so the invocation fast path performs no
//! allocation beyond scratch output staging. One invocation is in flight
//! at a time; `invoke` takes `&mut self`.

use crate::backend::{DeviceBackend, TensorView};
use crate::device::Device;
use crate::error::{Result, RuntimeError};
use lantern_core::{Executable, Instruction, Tensor};

/// Lifecycle state of an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// Buffers allocated, accepting invocations
    Ready,

    /// An invocation is in flight
    Running,

    /// Buffers released; invocations fail
    Closed,
}

/// Runtime binding of an executable to a device
#[derive(Debug)]
pub struct VmExecutor<B: DeviceBackend> {
    executable: Executable,
    device: Device,
    backend: B,
    buffers: Vec<Vec<f64>>,
    state: ExecutorState,
}

impl<B: DeviceBackend> VmExecutor<B> {
    /// Bind `executable` to `device`, allocating every buffer of the
    /// memory plan up front.
    pub fn new(executable: Executable, device: Device, backend: B) -> Result<Self> {
        if backend.kind() != device.kind {
            return Err(RuntimeError::Backend(format!(
                "backend drives {} devices, got {}",
                backend.kind().name(),
                device
            )));
        }
        let buffers: Vec<Vec<f64>> = executable
            .memory_plan
            .buffers
            .iter()
            .map(|spec| vec![0.0; spec.elements])
            .collect();
        tracing::debug!(
            device = %device,
            buffers = buffers.len(),
            bytes = executable.memory_plan.total_bytes(),
            "executor ready"
        );
        Ok(Self {
            executable,
            device,
            backend,
            buffers,
            state: ExecutorState::Ready,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// The bound executable
    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    /// The bound device
    pub fn device(&self) -> Device {
        self.device
    }

    /// Run one invocation with concrete input tensors. Inputs must match
    /// the declared parameter arity and types; mismatches fail before any
    /// instruction is dispatched.
    pub fn invoke(&mut self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        if self.state == ExecutorState::Closed {
            return Err(RuntimeError::ClosedExecutor);
        }
        self.check_inputs(inputs)?;
        self.state = ExecutorState::Running;
        let result = self.run(inputs);
        self.state = ExecutorState::Ready;
        result
    }

    /// Release all device buffers. Idempotent; later invocations fail
    /// with `ClosedExecutor`.
    pub fn close(&mut self) {
        self.buffers = Vec::new();
        self.state = ExecutorState::Closed;
    }

    fn check_inputs(&self, inputs: &[Tensor]) -> Result<()> {
        let params = &self.executable.params;
        if inputs.len() != params.len() {
            return Err(RuntimeError::Invocation(format!(
                "expected {} arguments, got {}",
                params.len(),
                inputs.len()
            )));
        }
        for (param, input) in params.iter().zip(inputs) {
            if input.ty != param.ty {
                return Err(RuntimeError::Invocation(format!(
                    "argument '{}' has type {}, expected {}",
                    param.name, input.ty, param.ty
                )));
            }
        }
        Ok(())
    }

    fn run(&mut self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let exec = &self.executable;
        let mut written = vec![false; exec.register_types.len()];

        for (param, input) in exec.params.iter().zip(inputs) {
            let buf = exec.memory_plan.buffer_of(param.reg).0 as usize;
            self.buffers[buf][..input.data.len()].copy_from_slice(&input.data);
            written[param.reg.0 as usize] = true;
        }

        for (pc, instr) in exec.instructions.iter().enumerate() {
            match instr {
                Instruction::LoadConst {
                    const_index,
                    dst,
                    stream: _,
                } => {
                    let constant = &exec.constants[*const_index];
                    let buf = exec.memory_plan.buffer_of(*dst).0 as usize;
                    self.buffers[buf][..constant.data.len()].copy_from_slice(&constant.data);
                    written[dst.0 as usize] = true;
                }
                Instruction::InvokeKernel {
                    kernel,
                    args,
                    dst,
                    stream,
                } => {
                    for r in args {
                        if !written[r.0 as usize] {
                            return Err(RuntimeError::DependencyViolation { pc, reg: r.0 });
                        }
                    }
                    let spec = &exec.kernels[*kernel];
                    let n = exec.register_types[dst.0 as usize].num_elements();
                    let mut out = vec![0.0; n];
                    {
                        let views: Vec<TensorView<'_>> = args
                            .iter()
                            .map(|r| {
                                let ty = &exec.register_types[r.0 as usize];
                                let buf = exec.memory_plan.buffer_of(*r).0 as usize;
                                TensorView {
                                    ty,
                                    data: &self.buffers[buf][..ty.num_elements()],
                                }
                            })
                            .collect();
                        self.backend.launch(spec, &views, &mut out, *stream)?;
                    }
                    let buf = exec.memory_plan.buffer_of(*dst).0 as usize;
                    self.buffers[buf][..n].copy_from_slice(&out);
                    written[dst.0 as usize] = true;
                }
                Instruction::Ret { values } => {
                    let mut outputs = Vec::with_capacity(values.len());
                    for r in values {
                        if !written[r.0 as usize] {
                            return Err(RuntimeError::DependencyViolation { pc, reg: r.0 });
                        }
                        let ty = exec.register_types[r.0 as usize].clone();
                        let buf = exec.memory_plan.buffer_of(*r).0 as usize;
                        let data = self.buffers[buf][..ty.num_elements()].to_vec();
                        outputs.push(Tensor { ty, data });
                    }
                    return Ok(outputs);
                }
            }
        }
        Err(RuntimeError::Backend(
            "executable has no return instruction".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use lantern_core::bytecode::ParamSpec;
    use lantern_core::{
        BufferId, BufferSpec, DType, KernelSpec, MemoryPlan, Reg, StreamId, TensorType,
    };

    fn add_const_executable() -> Executable {
        let ty = TensorType::new(vec![1, 4], DType::F32);
        Executable {
            params: vec![ParamSpec {
                name: "x".to_string(),
                ty: ty.clone(),
                reg: Reg(0),
            }],
            instructions: vec![
                Instruction::LoadConst {
                    const_index: 0,
                    dst: Reg(1),
                    stream: StreamId(0),
                },
                Instruction::InvokeKernel {
                    kernel: 0,
                    args: vec![Reg(0), Reg(1)],
                    dst: Reg(2),
                    stream: StreamId(0),
                },
                Instruction::Ret {
                    values: vec![Reg(2)],
                },
            ],
            constants: vec![Tensor::f32(vec![1, 4], vec![1.0; 4]).unwrap()],
            kernels: vec![KernelSpec {
                ops: vec!["add".to_string()],
                variant: "default".to_string(),
                out_ty: ty.clone(),
            }],
            memory_plan: MemoryPlan {
                buffers: vec![
                    BufferSpec {
                        size_bytes: 16,
                        elements: 4,
                    };
                    3
                ],
                register_buffers: vec![BufferId(0), BufferId(1), BufferId(2)],
            },
            register_types: vec![ty.clone(), ty.clone(), ty],
            num_streams: 1,
        }
    }

    #[test]
    fn test_invoke_add_const() {
        let mut vm =
            VmExecutor::new(add_const_executable(), Device::cpu(0), CpuBackend).unwrap();
        let input = Tensor::f32(vec![1, 4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let outputs = vm.invoke(&[input]).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].data, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(vm.state(), ExecutorState::Ready);
    }

    #[test]
    fn test_arity_mismatch_fails_before_dispatch() {
        let mut vm =
            VmExecutor::new(add_const_executable(), Device::cpu(0), CpuBackend).unwrap();
        let err = vm.invoke(&[]).unwrap_err();
        assert!(matches!(err, RuntimeError::Invocation(_)));
        assert_eq!(vm.state(), ExecutorState::Ready);
    }

    #[test]
    fn test_type_mismatch_fails_before_dispatch() {
        let mut vm =
            VmExecutor::new(add_const_executable(), Device::cpu(0), CpuBackend).unwrap();
        let wrong = Tensor::f32(vec![4], vec![1.0; 4]).unwrap();
        let err = vm.invoke(&[wrong]).unwrap_err();
        assert!(matches!(err, RuntimeError::Invocation(_)));
    }

    #[test]
    fn test_close_then_invoke_fails() {
        let mut vm =
            VmExecutor::new(add_const_executable(), Device::cpu(0), CpuBackend).unwrap();
        vm.close();
        assert_eq!(vm.state(), ExecutorState::Closed);
        let input = Tensor::f32(vec![1, 4], vec![1.0; 4]).unwrap();
        let err = vm.invoke(&[input]).unwrap_err();
        assert!(matches!(err, RuntimeError::ClosedExecutor));
        // Closing again is a no-op.
        vm.close();
        assert_eq!(vm.state(), ExecutorState::Closed);
    }

    #[test]
    fn test_backend_device_mismatch() {
        let err = VmExecutor::new(add_const_executable(), Device::cuda(0), CpuBackend)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Backend(_)));
    }

    #[test]
    fn test_executor_is_reusable() {
        let mut vm =
            VmExecutor::new(add_const_executable(), Device::cpu(0), CpuBackend).unwrap();
        for round in 0..3 {
            let input = Tensor::f32(vec![1, 4], vec![round as f64; 4]).unwrap();
            let outputs = vm.invoke(&[input]).unwrap();
            assert_eq!(outputs[0].data, vec![round as f64 + 1.0; 4]);
        }
    }
}
