//! Summary statistics over a finished netlist, for diagnostics only — no
//! bearing on simulation semantics (SPEC_FULL §4).

use super::gate::Gate;
use super::netlist::Netlist;

/// Gate/DFF counts by kind, schedule depth, and fan-out histogram for a
/// finished [`Netlist`].
#[derive(Clone, Debug, Default)]
pub struct CircuitStats {
    pub and_count: usize,
    pub or_count: usize,
    pub xor_count: usize,
    pub not_count: usize,
    pub mux_count: usize,
    pub buf_count: usize,
    pub const_count: usize,
    pub dff_count: usize,
    pub net_count: u32,
    /// Number of distinct levels in `schedule`, if the IR has been
    /// scheduled and the scheduler recorded level boundaries; `None`
    /// otherwise. Computed here as "unknown" since the flat `schedule`
    /// field does not itself carry level boundaries — callers in
    /// `hdlcore-sched` that retain the level structure can set this
    /// directly via [`CircuitStats::with_depth`].
    pub schedule_depth: Option<usize>,
    /// `fan_out[k]` = number of nets driven by a gate/DFF output consumed
    /// by exactly `k` other gates or outputs; index 0 = unconsumed nets.
    pub fan_out_histogram: Vec<usize>,
}

impl CircuitStats {
    /// Computes gate/DFF counts and the fan-out histogram from `ir`.
    /// Schedule depth is left unset; see [`CircuitStats::with_depth`].
    pub fn compute(ir: &Netlist) -> Self {
        let mut stats = CircuitStats {
            net_count: ir.net_count(),
            dff_count: ir.dffs.len(),
            ..Default::default()
        };

        for gate in &ir.gates {
            match gate {
                Gate::And { .. } => stats.and_count += 1,
                Gate::Or { .. } => stats.or_count += 1,
                Gate::Xor { .. } => stats.xor_count += 1,
                Gate::Not { .. } => stats.not_count += 1,
                Gate::Mux { .. } => stats.mux_count += 1,
                Gate::Buf { .. } => stats.buf_count += 1,
                Gate::Const { .. } => stats.const_count += 1,
            }
        }

        let mut fan_out = vec![0usize; ir.net_count() as usize];
        for gate in &ir.gates {
            for input in gate.inputs() {
                fan_out[usize::from(input)] += 1;
            }
        }
        for dff in &ir.dffs {
            fan_out[usize::from(dff.d)] += 1;
            if let Some(rst) = dff.rst {
                fan_out[usize::from(rst)] += 1;
            }
            if let Some(en) = dff.en {
                fan_out[usize::from(en)] += 1;
            }
        }
        for (_, nets) in ir.outputs() {
            for &net in nets {
                fan_out[usize::from(net)] += 1;
            }
        }

        let max_fanout = fan_out.iter().copied().max().unwrap_or(0);
        let mut histogram = vec![0usize; max_fanout + 1];
        for count in fan_out {
            histogram[count] += 1;
        }
        stats.fan_out_histogram = histogram;

        stats
    }

    /// Attaches a known schedule depth (number of distinct dependency
    /// levels), as computed by the scheduler.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.schedule_depth = Some(depth);
        self
    }

    pub fn total_gates(&self) -> usize {
        self.and_count
            + self.or_count
            + self.xor_count
            + self.not_count
            + self.mux_count
            + self.buf_count
            + self.const_count
    }
}
