//! The topological scheduler: Kahn's algorithm plus combinational-loop
//! detection (spec §4.E).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use hdlcore::{Error, Locator, Netlist, Result};
use tracing::warn;

/// Computes a `schedule` — a permutation of gate indices such that every
/// gate appears after the gates producing its non-DFF, non-external
/// inputs (spec §4.E) — and returns it without mutating `ir`.
///
/// Seeded with every gate whose inputs are all either external inputs,
/// other gates' not-yet-known status (handled via in-degree), or DFF `q`
/// outputs (which are scheduling roots, never dependency edges). Ties are
/// broken by ascending gate index via a min-heap, which is stronger than
/// spec §4.E strictly requires but still satisfies it and keeps the
/// result deterministic across runs.
pub fn schedule(ir: &Netlist) -> Result<Vec<u32>> {
    let net_count = ir.net_count() as usize;
    let mut is_dff_output = FixedBitSet::with_capacity(net_count);
    for dff in &ir.dffs {
        is_dff_output.insert(usize::from(dff.q));
    }

    let mut driver: Vec<Option<usize>> = vec![None; net_count];
    for (idx, gate) in ir.gates.iter().enumerate() {
        driver[usize::from(gate.output())] = Some(idx);
    }

    let mut indegree = vec![0u32; ir.gates.len()];
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); ir.gates.len()];
    for (idx, gate) in ir.gates.iter().enumerate() {
        for input in gate.inputs() {
            let net = usize::from(input);
            if is_dff_output.contains(net) {
                continue;
            }
            if let Some(producer) = driver[net] {
                indegree[idx] += 1;
                consumers[producer].push(idx);
            }
        }
    }

    let mut heap = BinaryHeap::new();
    for (idx, &deg) in indegree.iter().enumerate() {
        if deg == 0 {
            heap.push(Reverse(idx));
        }
    }

    let mut order = Vec::with_capacity(ir.gates.len());
    let mut scheduled = FixedBitSet::with_capacity(ir.gates.len());
    // Defensive cap: a correct Kahn's implementation never exceeds one pop
    // per gate, so this only fires if the worklist bookkeeping itself is
    // broken, not on a genuine combinational loop (that case is detected
    // below once the heap is empty).
    let cap = ir.gates.len().saturating_add(1);
    let mut iterations = 0usize;

    while let Some(Reverse(idx)) = heap.pop() {
        iterations += 1;
        if iterations > cap {
            return Err(Error::ScheduleNotProgressing {
                remaining: ir.gates.len() - order.len(),
                locator: Locator::Gate(idx),
            });
        }
        order.push(idx as u32);
        scheduled.insert(idx);
        for &consumer in &consumers[idx] {
            indegree[consumer] -= 1;
            if indegree[consumer] == 0 {
                heap.push(Reverse(consumer));
            }
        }
    }

    if order.len() < ir.gates.len() {
        let residual: Vec<usize> = (0..ir.gates.len()).filter(|&i| !scheduled.contains(i)).collect();
        warn!(residual = residual.len(), "combinational loop detected during scheduling");
        let first = residual[0];
        return Err(Error::CombinationalLoop {
            residual,
            locator: Locator::Gate(first),
        });
    }

    Ok(order)
}

/// Computes and attaches a schedule to `ir` in place.
pub fn schedule_in_place(ir: &mut Netlist) -> Result<()> {
    let order = schedule(ir)?;
    ir.schedule = Some(order);
    Ok(())
}
