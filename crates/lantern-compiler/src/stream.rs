//! Stream assignment
//!
//! Partitions the instruction stream across logical device streams while
//! preserving every true data dependency. Emission order is always program
//! order, so per-stream order is a stable subsequence of program order.

use crate::context::StreamPolicy;
use crate::error::{CompileError, Result};
use lantern_core::{Function, Instruction, Reg, StreamId, ValueId};
use std::collections::{HashMap, HashSet};

/// Assign a stream to each binding of `function` (one lowered instruction
/// per binding, in binding order).
pub fn assign_streams(function: &Function, policy: &StreamPolicy) -> Vec<StreamId> {
    match policy {
        StreamPolicy::Sequential => vec![StreamId(0); function.bindings.len()],
        StreamPolicy::Wavefront { streams } => wavefront(function, (*streams).max(1)),
    }
}

/// Bucket bindings by dependency depth (longest producer chain), then deal
/// each bucket round-robin across streams in program order.
fn wavefront(function: &Function, streams: u32) -> Vec<StreamId> {
    let producer_index: HashMap<ValueId, usize> = function
        .bindings
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id, i))
        .collect();

    let mut depth = vec![0usize; function.bindings.len()];
    for (i, binding) in function.bindings.iter().enumerate() {
        for arg in binding.expr.args() {
            if let Some(&p) = producer_index.get(arg) {
                depth[i] = depth[i].max(depth[p] + 1);
            }
        }
    }

    let mut seen_in_bucket: HashMap<usize, u32> = HashMap::new();
    depth
        .iter()
        .map(|&d| {
            let slot = seen_in_bucket.entry(d).or_insert(0);
            let stream = StreamId(*slot % streams);
            *slot += 1;
            stream
        })
        .collect()
}

/// Verify a lowered schedule: every register is written at most once, and
/// every read happens after the write that produces it (parameters count
/// as written at entry). A violation is an internal invariant breach.
pub fn validate_schedule(instructions: &[Instruction], param_regs: &[Reg]) -> Result<()> {
    let mut written: HashSet<Reg> = param_regs.iter().copied().collect();
    for (pc, instr) in instructions.iter().enumerate() {
        for read in instr.reads() {
            if !written.contains(read) {
                return Err(CompileError::Scheduling(format!(
                    "instruction {} reads r{} before it is written",
                    pc, read.0
                )));
            }
        }
        if let Some(dst) = instr.writes() {
            if !written.insert(dst) {
                return Err(CompileError::Scheduling(format!(
                    "instruction {} rewrites r{}",
                    pc, dst.0
                )));
            }
        }
    }
    Ok(())
}
