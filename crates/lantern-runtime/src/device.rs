//! Device handles
//!
//! A device is an opaque compute target identified by kind and index. It is
//! supplied by the caller and assumed valid for the executor's lifetime;
//! the pipeline never probes it.

use serde::{Deserialize, Serialize};

/// Compute target kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Cuda,
}

impl DeviceKind {
    /// Target kind identifier used by the compiler
    pub fn name(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Cuda => "cuda",
        }
    }
}

/// An opaque device handle: kind plus ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    /// Target kind
    pub kind: DeviceKind,

    /// Device ordinal within the kind
    pub index: usize,
}

impl Device {
    /// CPU device at `index`
    pub fn cpu(index: usize) -> Self {
        Self {
            kind: DeviceKind::Cpu,
            index,
        }
    }

    /// CUDA device at `index`
    pub fn cuda(index: usize) -> Self {
        Self {
            kind: DeviceKind::Cuda,
            index,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind.name(), self.index)
    }
}
