//! Compilation options
//!
//! The recognized option surface is a struct, so an unknown key is a
//! compile-time impossibility rather than a silently ignored entry. The
//! stream policy stays a string here (it arrives from configuration) and
//! is validated when the options are turned into a `PassContext`.

use crate::error::Result;
use lantern_compiler::{Pass, PassContext, StreamPolicy};
use std::path::PathBuf;

/// Options accepted by the high-level compile entry points
pub struct CompileOptions {
    /// Coarse optimization knob; 0 disables the optimization bundle
    pub opt_level: u32,

    /// Fusion aggressiveness: maximum unary epilogues per kernel
    pub fuse_level: u32,

    /// Stream scheduling policy name, validated at compile time
    pub stream_schedule_policy: String,

    /// Allow buffer aliasing across non-overlapping live ranges
    pub reuse_storage: bool,

    /// Optional persisted operator schedule cache
    pub sch_file: Option<PathBuf>,

    /// Extra passes to run after type inference, in order
    pub pass_seq: Vec<Box<dyn Pass>>,
}

impl CompileOptions {
    /// Options with all defaults
    pub fn new() -> Self {
        Self {
            opt_level: 2,
            fuse_level: 0,
            stream_schedule_policy: "sequential".to_string(),
            reuse_storage: false,
            sch_file: None,
            pass_seq: Vec::new(),
        }
    }

    /// Validate and convert into a pass context. Fails on an unrecognized
    /// stream policy name.
    pub fn to_context(&self) -> Result<PassContext> {
        let policy: StreamPolicy = self.stream_schedule_policy.parse()?;
        let mut cx = PassContext::new()
            .with_opt_level(self.opt_level)
            .with_fuse_level(self.fuse_level)
            .with_stream_policy(policy)
            .with_reuse_storage(self.reuse_storage);
        if let Some(path) = &self.sch_file {
            cx = cx.with_sch_file(path.clone());
        }
        Ok(cx)
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("opt_level", &self.opt_level)
            .field("fuse_level", &self.fuse_level)
            .field("stream_schedule_policy", &self.stream_schedule_policy)
            .field("reuse_storage", &self.reuse_storage)
            .field("sch_file", &self.sch_file)
            .field("pass_seq", &self.pass_seq.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use lantern_compiler::CompileError;

    #[test]
    fn test_defaults_match_pipeline_defaults() {
        let cx = CompileOptions::new().to_context().unwrap();
        assert_eq!(cx, PassContext::default());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let mut options = CompileOptions::new();
        options.stream_schedule_policy = "chaotic".to_string();
        let err = options.to_context().unwrap_err();
        assert!(matches!(
            err,
            SdkError::Compile(CompileError::UnknownOption { ref key, .. })
                if key == "stream_schedule_policy"
        ));
    }

    #[test]
    fn test_fields_carry_through() {
        let mut options = CompileOptions::new();
        options.fuse_level = 3;
        options.reuse_storage = true;
        options.stream_schedule_policy = "wavefront".to_string();
        let cx = options.to_context().unwrap();
        assert_eq!(cx.fuse_level, 3);
        assert!(cx.reuse_storage);
        assert_eq!(cx.stream_policy, StreamPolicy::Wavefront { streams: 2 });
    }
}
