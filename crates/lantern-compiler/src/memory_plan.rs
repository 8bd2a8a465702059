//! Memory planning
//!
//! Assigns every register a physical buffer. Without reuse each register
//! gets its own buffer; with reuse a linear scan recycles buffers whose
//! live range has ended, matching on exact byte size with FIFO order
//! inside a size class. Parameter and output registers never enter the
//! free list, so inputs stay intact for a whole invocation and outputs are
//! never clobbered.

use crate::liveness::LiveRange;
use lantern_core::{BufferId, BufferSpec, Function, MemoryPlan, TensorType};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashSet, VecDeque};

/// Plan buffers for a function given its live ranges and register types
pub fn plan_memory(
    function: &Function,
    ranges: &[LiveRange],
    register_types: &[TensorType],
    reuse: bool,
) -> MemoryPlan {
    let param_count = function.params.len();

    if !reuse {
        let buffers = register_types
            .iter()
            .map(|ty| BufferSpec {
                size_bytes: ty.size_bytes(),
                elements: ty.num_elements(),
            })
            .collect();
        let register_buffers = (0..register_types.len() as u32).map(BufferId).collect();
        return MemoryPlan {
            buffers,
            register_buffers,
        };
    }

    let output_regs: HashSet<usize> = {
        let (_, reg_of) = crate::liveness::register_order(function);
        function
            .outputs
            .iter()
            .filter_map(|id| reg_of.get(id).copied())
            .collect()
    };

    let mut buffers: Vec<BufferSpec> = Vec::new();
    let mut register_buffers: Vec<BufferId> = Vec::with_capacity(register_types.len());
    // Buffers pending expiry, ordered by (last_use, buffer id) for a
    // deterministic release order.
    let mut expiring: BinaryHeap<Reverse<(usize, u32)>> = BinaryHeap::new();
    let mut free: BTreeMap<usize, VecDeque<u32>> = BTreeMap::new();

    for (reg, ty) in register_types.iter().enumerate() {
        let def = ranges[reg].def;
        while let Some(&Reverse((last_use, buf))) = expiring.peek() {
            if last_use >= def {
                break;
            }
            expiring.pop();
            free.entry(buffers[buf as usize].size_bytes)
                .or_default()
                .push_back(buf);
        }

        let size = ty.size_bytes();
        let recycled = if reg >= param_count {
            free.get_mut(&size).and_then(|q| q.pop_front())
        } else {
            None
        };
        let buf = match recycled {
            Some(buf) => {
                let spec = &mut buffers[buf as usize];
                spec.elements = spec.elements.max(ty.num_elements());
                buf
            }
            None => {
                buffers.push(BufferSpec {
                    size_bytes: size,
                    elements: ty.num_elements(),
                });
                (buffers.len() - 1) as u32
            }
        };
        register_buffers.push(BufferId(buf));

        if reg >= param_count && !output_regs.contains(&reg) {
            expiring.push(Reverse((ranges[reg].last_use, buf)));
        }
    }

    MemoryPlan {
        buffers,
        register_buffers,
    }
}
