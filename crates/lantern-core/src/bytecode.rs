//! Compiled executable format
//!
//! Lowering produces an `Executable`: a linear instruction sequence over a
//! dense register file, a constant pool, a kernel table, a memory plan
//! mapping registers to physical buffers, and a stream assignment baked
//! into each instruction. An executable is immutable once produced and can
//! be serialized for inspection or caching.

use crate::error::{CoreError, Result};
use crate::tensor::{Tensor, TensorType};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Register index: one register per IR value of the entry function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reg(pub u32);

/// Physical buffer index within a memory plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferId(pub u32);

/// Logical device stream index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub u32);

/// A single bytecode instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Materialize a pooled constant into a register
    LoadConst {
        /// Index into the constant pool
        const_index: usize,
        /// Destination register
        dst: Reg,
        /// Assigned stream
        stream: StreamId,
    },

    /// Dispatch one kernel (possibly a fused chain)
    InvokeKernel {
        /// Index into the kernel table
        kernel: usize,
        /// Argument registers of the primary operator
        args: Vec<Reg>,
        /// Destination register
        dst: Reg,
        /// Assigned stream
        stream: StreamId,
    },

    /// Return the listed registers, in declaration order
    Ret {
        /// Output registers
        values: Vec<Reg>,
    },
}

impl Instruction {
    /// Registers this instruction reads
    pub fn reads(&self) -> &[Reg] {
        match self {
            Instruction::LoadConst { .. } => &[],
            Instruction::InvokeKernel { args, .. } => args,
            Instruction::Ret { values } => values,
        }
    }

    /// Register this instruction writes, if any
    pub fn writes(&self) -> Option<Reg> {
        match self {
            Instruction::LoadConst { dst, .. } => Some(*dst),
            Instruction::InvokeKernel { dst, .. } => Some(*dst),
            Instruction::Ret { .. } => None,
        }
    }

    /// Assigned stream, if the instruction dispatches device work
    pub fn stream(&self) -> Option<StreamId> {
        match self {
            Instruction::LoadConst { stream, .. } => Some(*stream),
            Instruction::InvokeKernel { stream, .. } => Some(*stream),
            Instruction::Ret { .. } => None,
        }
    }
}

/// One entry of the kernel table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    /// Operator chain, primary first; epilogues are unary elementwise
    pub ops: Vec<String>,

    /// Implementation variant, `"default"` unless a schedule cache
    /// overrides it
    pub variant: String,

    /// Result type of the chain
    pub out_ty: TensorType,
}

impl KernelSpec {
    /// Joined chain name, e.g. `"matmul+relu"`
    pub fn chain_name(&self) -> String {
        self.ops.join("+")
    }
}

/// Size requirements of one physical buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferSpec {
    /// Device size in bytes
    pub size_bytes: usize,

    /// Host element capacity (max over all registers mapped here)
    pub elements: usize,
}

/// Assignment of registers to physical buffers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPlan {
    /// Buffer table
    pub buffers: Vec<BufferSpec>,

    /// `register_buffers[r]` is the buffer backing register `r`
    pub register_buffers: Vec<BufferId>,
}

impl MemoryPlan {
    /// Buffer backing the given register
    pub fn buffer_of(&self, reg: Reg) -> BufferId {
        self.register_buffers[reg.0 as usize]
    }

    /// Total planned bytes
    pub fn total_bytes(&self) -> usize {
        self.buffers.iter().map(|b| b.size_bytes).sum()
    }
}

/// Declared entry parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,

    /// Declared type
    pub ty: TensorType,

    /// Register holding this parameter at invocation
    pub reg: Reg,
}

/// A compiled, immutable executable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Executable {
    /// Entry parameters, in declaration order
    pub params: Vec<ParamSpec>,

    /// Linear instruction sequence, in emission order
    pub instructions: Vec<Instruction>,

    /// Constant pool
    pub constants: Vec<Tensor>,

    /// Kernel table, indexed by `InvokeKernel::kernel`
    pub kernels: Vec<KernelSpec>,

    /// Buffer assignment
    pub memory_plan: MemoryPlan,

    /// Resolved type of every register
    pub register_types: Vec<TensorType>,

    /// Number of logical streams used by the schedule
    pub num_streams: u32,
}

impl Executable {
    /// Number of entry parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Name of the parameter at `index`
    pub fn param_name(&self, index: usize) -> Result<&str> {
        self.params
            .get(index)
            .map(|p| p.name.as_str())
            .ok_or_else(|| CoreError::NotFound(format!("parameter index {}", index)))
    }

    /// Human-readable bytecode listing
    pub fn bytecode_text(&self) -> String {
        let mut out = String::new();
        let names: Vec<&str> = self.params.iter().map(|p| p.name.as_str()).collect();
        let _ = writeln!(out, "main({})", names.join(", "));
        let _ = writeln!(out, "# register file size = {}", self.register_types.len());
        let _ = writeln!(out, "# instruction count = {}", self.instructions.len());
        let _ = writeln!(out, "# streams = {}", self.num_streams);
        for (idx, instr) in self.instructions.iter().enumerate() {
            match instr {
                Instruction::LoadConst {
                    const_index,
                    dst,
                    stream,
                } => {
                    let _ = writeln!(
                        out,
                        "{:3}: load_const const[{}] -> r{} @s{}",
                        idx, const_index, dst.0, stream.0
                    );
                }
                Instruction::InvokeKernel {
                    kernel,
                    args,
                    dst,
                    stream,
                } => {
                    let regs: Vec<String> = args.iter().map(|r| format!("r{}", r.0)).collect();
                    let _ = writeln!(
                        out,
                        "{:3}: invoke {}({}) -> r{} @s{}",
                        idx,
                        self.kernels[*kernel].chain_name(),
                        regs.join(", "),
                        dst.0,
                        stream.0
                    );
                }
                Instruction::Ret { values } => {
                    let regs: Vec<String> = values.iter().map(|r| format!("r{}", r.0)).collect();
                    let _ = writeln!(out, "{:3}: ret {}", idx, regs.join(", "));
                }
            }
        }
        out
    }

    /// Serialize to JSON
    pub fn save_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::InvalidValue(format!("serialize executable: {}", e)))
    }

    /// Deserialize from JSON
    pub fn load_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CoreError::InvalidValue(format!("deserialize executable: {}", e)))
    }
}
