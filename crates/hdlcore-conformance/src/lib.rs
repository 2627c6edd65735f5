//! The conformance harness (spec §4.G): runs a behavioral component and
//! its lowered + scheduled + evaluated structural counterpart against the
//! same per-cycle stimulus and reports the first point, if any, where
//! their externally visible outputs diverge.
//!
//! This is the framework's primary correctness oracle (spec §2): the
//! behavioral simulator is definitionally correct by construction (it is
//! the direct translation of a component's declared behavior), and every
//! other evaluation path is checked against it.

use ahash::AHashMap;
use hdlcore::Result;
use hdlcore_behavioral::BehavioralSimulator;
use hdlcore_eval::{ScalarWord, Simulator};
use hdlcore_signal::WireId;
use tracing::debug;

/// One cycle's worth of input assignments, by external port name.
pub type CycleInput = AHashMap<String, u64>;

/// A stimulus sequence: one [`CycleInput`] applied before each cycle's
/// clock edge (spec §4.G).
#[derive(Debug, Default, Clone)]
pub struct Stimulus {
    pub cycles: Vec<CycleInput>,
}

impl Stimulus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_cycle(&mut self, inputs: CycleInput) -> &mut Self {
        self.cycles.push(inputs);
        self
    }
}

/// A single observed divergence between the two simulators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub cycle: usize,
    pub port: String,
    pub behavioral: u64,
    pub structural: u64,
}

/// The outcome of running a [`Stimulus`] through both simulators.
#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub cycles_run: usize,
    pub mismatches: Vec<Mismatch>,
}

impl ConformanceReport {
    pub fn is_conformant(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Binds a behavioral simulator's top-level ports (by [`WireId`]) and a
/// structural [`Simulator`]'s ports (by name) to shared external names,
/// then drives both from a [`Stimulus`] and diffs their outputs every
/// cycle.
pub struct ConformanceHarness<'a> {
    behavioral: &'a mut BehavioralSimulator,
    structural: &'a mut Simulator<ScalarWord>,
    clock_wire: WireId,
    input_wires: Vec<(String, WireId)>,
    output_wires: Vec<(String, WireId)>,
}

impl<'a> ConformanceHarness<'a> {
    /// `input_wires`/`output_wires` pair each external port name with the
    /// [`WireId`] on `behavioral`'s bus that carries it; `structural` is
    /// expected to expose identically named input/output ports (true by
    /// construction when both were built from the same `external_inputs`/
    /// `external_outputs` list passed to `hdlcore_lower::lower`).
    pub fn new(
        behavioral: &'a mut BehavioralSimulator,
        structural: &'a mut Simulator<ScalarWord>,
        clock_wire: WireId,
        input_wires: Vec<(String, WireId)>,
        output_wires: Vec<(String, WireId)>,
    ) -> Self {
        Self {
            behavioral,
            structural,
            clock_wire,
            input_wires,
            output_wires,
        }
    }

    fn apply_inputs(&mut self, inputs: &CycleInput) -> Result<()> {
        for (port, wire) in &self.input_wires {
            if let Some(&value) = inputs.get(port) {
                self.behavioral.bus.set(*wire, value);
                self.structural.poke_scalar(port, 0, value)?;
            }
        }
        Ok(())
    }

    fn compare_outputs(&self, cycle: usize, mismatches: &mut Vec<Mismatch>) -> Result<()> {
        for (port, wire) in &self.output_wires {
            let behavioral = self.behavioral.bus.get(*wire);
            let structural = self.structural.peek_scalar(port, 0)?;
            if behavioral != structural {
                mismatches.push(Mismatch {
                    cycle,
                    port: port.clone(),
                    behavioral,
                    structural,
                });
            }
        }
        Ok(())
    }

    /// Drives both simulators through `stimulus`, comparing every output
    /// after each cycle. Does not stop at the first mismatch — collects
    /// all of them so the caller sees the full divergence, not just its
    /// onset.
    pub fn run(&mut self, stimulus: &Stimulus) -> Result<ConformanceReport> {
        let mut mismatches = Vec::new();
        for (cycle, inputs) in stimulus.cycles.iter().enumerate() {
            self.apply_inputs(inputs)?;

            self.behavioral.bus.set(self.clock_wire, 1);
            self.behavioral.propagate()?;
            self.behavioral.bus.set(self.clock_wire, 0);
            self.behavioral.propagate()?;
            self.structural.tick()?;

            self.compare_outputs(cycle, &mut mismatches)?;
            debug!(cycle, mismatches = mismatches.len(), "conformance cycle checked");
        }
        Ok(ConformanceReport {
            cycles_run: stimulus.cycles.len(),
            mismatches,
        })
    }
}
