//! Liveness analysis over IR values
//!
//! Values are numbered as registers in lowering order: parameters first,
//! then one register per binding. Positions are instruction slots:
//! parameters are defined at slot 0, binding `i` at slot `i + 1`, and the
//! return consumes outputs at slot `bindings.len() + 1`.

use lantern_core::{Function, ValueId};
use std::collections::HashMap;

/// Half-open-free live interval: value exists from `def` through `last_use`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveRange {
    /// Slot at which the value is defined
    pub def: usize,

    /// Last slot at which the value is read (equals `def` if never read)
    pub last_use: usize,
}

impl LiveRange {
    /// Whether two ranges share any slot
    pub fn overlaps(&self, other: &LiveRange) -> bool {
        self.def <= other.last_use && other.def <= self.last_use
    }
}

/// Register numbering for a function: parameters, then bindings, in order.
/// Returns the ordered id list and the id-to-register map.
pub fn register_order(function: &Function) -> (Vec<ValueId>, HashMap<ValueId, usize>) {
    let mut order = Vec::with_capacity(function.value_count());
    for param in &function.params {
        order.push(param.id);
    }
    for binding in &function.bindings {
        order.push(binding.id);
    }
    let map = order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    (order, map)
}

/// Compute live ranges for every register of `function`
pub fn liveness(function: &Function) -> Vec<LiveRange> {
    let (order, reg_of) = register_order(function);

    let mut ranges: Vec<LiveRange> = Vec::with_capacity(order.len());
    for (reg, _) in order.iter().enumerate() {
        let def = if reg < function.params.len() {
            0
        } else {
            reg - function.params.len() + 1
        };
        ranges.push(LiveRange { def, last_use: def });
    }

    for (i, binding) in function.bindings.iter().enumerate() {
        let slot = i + 1;
        for arg in binding.expr.args() {
            if let Some(&reg) = reg_of.get(arg) {
                ranges[reg].last_use = ranges[reg].last_use.max(slot);
            }
        }
    }

    let ret_slot = function.bindings.len() + 1;
    for output in &function.outputs {
        if let Some(&reg) = reg_of.get(output) {
            ranges[reg].last_use = ret_slot;
        }
    }

    ranges
}
