//! Pass configuration context
//!
//! One `PassContext` is created per compilation run, is read-only while
//! passes execute, and is discarded afterwards. Every recognized option is
//! an explicit field with a documented default; unrecognized stream policy
//! names are rejected rather than ignored.

use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// How independent instructions are assigned to device streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPolicy {
    /// Single stream, total program order; no scheduling nondeterminism
    Sequential,

    /// Dependency-depth wavefronts distributed round-robin over streams
    Wavefront {
        /// Number of logical streams, at least 1
        streams: u32,
    },
}

impl StreamPolicy {
    /// Default stream count for the wavefront scheduler
    pub const DEFAULT_WAVEFRONT_STREAMS: u32 = 2;
}

impl FromStr for StreamPolicy {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(StreamPolicy::Sequential),
            "wavefront" => Ok(StreamPolicy::Wavefront {
                streams: Self::DEFAULT_WAVEFRONT_STREAMS,
            }),
            other => Err(CompileError::UnknownOption {
                key: "stream_schedule_policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration shared by every pass of one compilation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassContext {
    /// Coarse optimization knob; 0 disables the built-in optimization
    /// bundle (including fusion) regardless of `fuse_level`
    pub opt_level: u32,

    /// Fusion aggressiveness: maximum unary epilogues folded into one
    /// kernel; 0 disables fusion
    pub fuse_level: u32,

    /// Stream scheduling policy
    pub stream_policy: StreamPolicy,

    /// Allow the memory planner to alias buffers across non-overlapping
    /// liveness ranges
    pub reuse_storage: bool,

    /// Optional persisted operator schedule cache
    pub sch_file: Option<PathBuf>,
}

impl PassContext {
    /// Context with default options
    pub fn new() -> Self {
        Self {
            opt_level: 2,
            fuse_level: 0,
            stream_policy: StreamPolicy::Sequential,
            reuse_storage: false,
            sch_file: None,
        }
    }

    /// Set the optimization level
    pub fn with_opt_level(mut self, level: u32) -> Self {
        self.opt_level = level;
        self
    }

    /// Set the fusion aggressiveness
    pub fn with_fuse_level(mut self, level: u32) -> Self {
        self.fuse_level = level;
        self
    }

    /// Set the stream scheduling policy
    pub fn with_stream_policy(mut self, policy: StreamPolicy) -> Self {
        self.stream_policy = policy;
        self
    }

    /// Enable or disable buffer reuse
    pub fn with_reuse_storage(mut self, reuse: bool) -> Self {
        self.reuse_storage = reuse;
        self
    }

    /// Set the schedule cache path
    pub fn with_sch_file(mut self, path: PathBuf) -> Self {
        self.sch_file = Some(path);
        self
    }
}

impl Default for PassContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cx = PassContext::default();
        assert_eq!(cx.opt_level, 2);
        assert_eq!(cx.fuse_level, 0);
        assert_eq!(cx.stream_policy, StreamPolicy::Sequential);
        assert!(!cx.reuse_storage);
        assert!(cx.sch_file.is_none());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "sequential".parse::<StreamPolicy>().unwrap(),
            StreamPolicy::Sequential
        );
        assert_eq!(
            "wavefront".parse::<StreamPolicy>().unwrap(),
            StreamPolicy::Wavefront { streams: 2 }
        );
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = "round_robin".parse::<StreamPolicy>().unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownOption { ref key, .. } if key == "stream_schedule_policy"
        ));
    }

    #[test]
    fn test_builder_methods() {
        let cx = PassContext::new()
            .with_opt_level(0)
            .with_fuse_level(3)
            .with_reuse_storage(true)
            .with_stream_policy(StreamPolicy::Wavefront { streams: 4 });
        assert_eq!(cx.opt_level, 0);
        assert_eq!(cx.fuse_level, 3);
        assert!(cx.reuse_storage);
        assert_eq!(cx.stream_policy, StreamPolicy::Wavefront { streams: 4 });
    }
}
