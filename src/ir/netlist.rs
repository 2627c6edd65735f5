//! The flat Netlist IR itself (spec §3, §4.C).

use crate::error::{Error, Locator, Result};

use super::gate::{Dff, Gate};
use super::net::NetId;

/// A flat primitive-gate + flip-flop netlist, the output of lowering and the
/// input to the scheduler and evaluator. Built once, then treated as
/// immutable (spec §3 "Lifecycle").
#[derive(Clone, Debug)]
pub struct Netlist {
    pub name: String,
    net_count: u32,
    /// External input ports, in declaration order, each an ordered list of
    /// per-bit net indices (LSB first).
    inputs: Vec<(String, Vec<NetId>)>,
    /// External output ports, same shape as `inputs`.
    outputs: Vec<(String, Vec<NetId>)>,
    pub gates: Vec<Gate>,
    pub dffs: Vec<Dff>,
    /// A permutation of `gates` indices in evaluation order, filled in by
    /// the scheduler. `None` until scheduled.
    pub schedule: Option<Vec<u32>>,
}

impl Netlist {
    /// Constructs a netlist from its parts. Does not validate; callers use
    /// [`Netlist::validate`] once all gates/dffs/ports are in place.
    pub fn new(
        name: impl Into<String>,
        net_count: u32,
        inputs: Vec<(String, Vec<NetId>)>,
        outputs: Vec<(String, Vec<NetId>)>,
        gates: Vec<Gate>,
        dffs: Vec<Dff>,
    ) -> Self {
        Self {
            name: name.into(),
            net_count,
            inputs,
            outputs,
            gates,
            dffs,
            schedule: None,
        }
    }

    pub fn net_count(&self) -> u32 {
        self.net_count
    }

    pub fn inputs(&self) -> &[(String, Vec<NetId>)] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[(String, Vec<NetId>)] {
        &self.outputs
    }

    /// Looks up an external input port's nets by name.
    pub fn input_port(&self, name: &str) -> Option<&[NetId]> {
        self.inputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, nets)| nets.as_slice())
    }

    /// Looks up an external output port's nets by name.
    pub fn output_port(&self, name: &str) -> Option<&[NetId]> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, nets)| nets.as_slice())
    }

    /// Validates the invariants of spec §3: in-range nets, single driver per
    /// net, correct gate arity. Does NOT check acyclicity — that is the
    /// scheduler's job (spec §4.E), since it requires a full dependency
    /// walk.
    pub fn validate(&self) -> Result<()> {
        let in_range = |net: NetId, locator: Locator| -> Result<()> {
            if u32::from(net) >= self.net_count {
                return Err(Error::UnknownPort {
                    port: format!("net #{net}"),
                    locator,
                });
            }
            Ok(())
        };

        let mut driver = vec![false; self.net_count as usize];
        let mut mark_driven = |net: NetId, locator: Locator| -> Result<()> {
            let idx = usize::from(net);
            if driver[idx] {
                return Err(Error::MultiDriver { locator });
            }
            driver[idx] = true;
            Ok(())
        };

        for (name, nets) in self.inputs.iter().chain(self.outputs.iter()) {
            for &net in nets {
                in_range(net, Locator::Component(name.clone()))?;
            }
        }
        for (name, nets) in &self.inputs {
            for &net in nets {
                mark_driven(net, Locator::Component(name.clone()))?;
            }
        }

        for (idx, gate) in self.gates.iter().enumerate() {
            let locator = Locator::Gate(idx);
            for input in gate.inputs() {
                in_range(input, locator.clone())?;
            }
            in_range(gate.output(), locator.clone())?;
            mark_driven(gate.output(), locator)?;
        }

        for (idx, dff) in self.dffs.iter().enumerate() {
            let locator = Locator::Gate(idx);
            in_range(dff.d, locator.clone())?;
            in_range(dff.q, locator.clone())?;
            if let Some(rst) = dff.rst {
                in_range(rst, locator.clone())?;
            }
            if let Some(en) = dff.en {
                in_range(en, locator.clone())?;
            }
            mark_driven(dff.q, locator)?;
        }

        Ok(())
    }
}
