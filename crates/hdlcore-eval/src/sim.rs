//! The bit-parallel `Simulator<W>` (spec §4.F): `poke`/`peek`/`evaluate`/
//! `tick`/`reset` over a scheduled [`Netlist`], generic over a lane word.

use hdlcore::{Error, Gate, Locator, NetId, Netlist, Result};
use tracing::debug;

use crate::word::Word;

/// Owns one lane-packed `nets` array for one [`Netlist`]. Side-effect-free
/// on the IR it was built from; distinct simulators over the same `Netlist`
/// reference never interfere (spec §4.F "Ordering & determinism").
#[derive(Debug)]
pub struct Simulator<W: Word> {
    ir: Netlist,
    lanes: u32,
    lane_mask: W,
    nets: Vec<W>,
}

impl<W: Word> Simulator<W> {
    /// Builds a simulator for `ir` at `lanes` active lanes, with every net
    /// initialized to `reset_value` (spec §6 `new(ir, lanes, reset_value=0)`
    /// — here `reset_value` seeds the *entire* initial net array, not a
    /// per-DFF override; per-DFF reset values only take effect through
    /// [`Simulator::reset`] or a sampled synchronous/asynchronous reset).
    ///
    /// Schedules `ir` in place if it hasn't been scheduled yet.
    pub fn new(mut ir: Netlist, lanes: u32, reset_value: bool) -> Result<Self> {
        if lanes == 0 || lanes > W::MAX_LANES {
            return Err(Error::InvalidWidth {
                width: lanes,
                locator: Locator::Unknown,
            });
        }
        if ir.schedule.is_none() {
            hdlcore_sched::schedule_in_place(&mut ir)?;
        }
        let lane_mask = W::lane_mask(lanes);
        let fill = if reset_value { lane_mask } else { W::zero() };
        let nets = vec![fill; ir.net_count() as usize];
        Ok(Self {
            ir,
            lanes,
            lane_mask,
            nets,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        W::NAME
    }

    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    pub fn ir(&self) -> &Netlist {
        &self.ir
    }

    fn port_nets<'a>(ports: &'a [(String, Vec<NetId>)], port: &str) -> Result<&'a [NetId]> {
        ports
            .iter()
            .find(|(name, _)| name == port)
            .map(|(_, nets)| nets.as_slice())
            .ok_or_else(|| Error::UnknownPort {
                port: port.to_string(),
                locator: Locator::Unknown,
            })
    }

    /// Writes the per-lane bits for external input `port`: one word per
    /// constituent net, LSB-first within the port.
    pub fn poke(&mut self, port: &str, bit_words: &[W]) -> Result<()> {
        let nets = Self::port_nets(self.ir.inputs(), port)?.to_vec();
        if nets.len() != bit_words.len() {
            return Err(Error::WidthMismatch {
                expected: nets.len() as u32,
                actual: bit_words.len() as u32,
                locator: Locator::Component(port.to_string()),
            });
        }
        for (&net, &word) in nets.iter().zip(bit_words) {
            self.nets[usize::from(net)] = word.and(self.lane_mask);
        }
        Ok(())
    }

    /// Reads external output `port`: the inverse of `poke`.
    pub fn peek(&self, port: &str) -> Result<Vec<W>> {
        let nets = Self::port_nets(self.ir.outputs(), port)?;
        Ok(nets.iter().map(|&net| self.nets[usize::from(net)]).collect())
    }

    /// Sets a single lane's value for `port`, encoding the port's nets
    /// LSB-first in `value`.
    pub fn poke_scalar(&mut self, port: &str, lane_index: u32, value: u64) -> Result<()> {
        if lane_index >= self.lanes {
            return Err(Error::InvalidWidth {
                width: lane_index,
                locator: Locator::Component(port.to_string()),
            });
        }
        let nets = Self::port_nets(self.ir.inputs(), port)?.to_vec();
        for (i, &net) in nets.iter().enumerate() {
            let bit = (value >> i) & 1 != 0;
            self.nets[usize::from(net)] = self.nets[usize::from(net)].with_bit(lane_index, bit);
        }
        Ok(())
    }

    /// Reads a single lane's value for `port`, inverse of `poke_scalar`.
    pub fn peek_scalar(&self, port: &str, lane_index: u32) -> Result<u64> {
        if lane_index >= self.lanes {
            return Err(Error::InvalidWidth {
                width: lane_index,
                locator: Locator::Component(port.to_string()),
            });
        }
        let nets = Self::port_nets(self.ir.outputs(), port)?;
        let mut value = 0u64;
        for (i, &net) in nets.iter().enumerate() {
            if self.nets[usize::from(net)].bit(lane_index) {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    fn gate_output(&self, gate: &Gate) -> W {
        match *gate {
            Gate::And { a, b, .. } => self.nets[usize::from(a)].and(self.nets[usize::from(b)]),
            Gate::Or { a, b, .. } => self.nets[usize::from(a)].or(self.nets[usize::from(b)]),
            Gate::Xor { a, b, .. } => self.nets[usize::from(a)].xor(self.nets[usize::from(b)]),
            Gate::Not { a, .. } => self.nets[usize::from(a)].not(self.lane_mask),
            Gate::Mux { sel, t, f, .. } => self.nets[usize::from(sel)].mux(
                self.nets[usize::from(t)],
                self.nets[usize::from(f)],
                self.lane_mask,
            ),
            Gate::Buf { a, .. } => self.nets[usize::from(a)],
            Gate::Const { value, .. } => {
                if value {
                    self.lane_mask
                } else {
                    W::zero()
                }
            }
        }
    }

    /// Evaluates every gate in `schedule` order (spec §4.F). No DFF state
    /// changes; calling this twice in a row without an intervening `poke`
    /// or `tick` is idempotent (testable property 7).
    pub fn evaluate(&mut self) -> Result<()> {
        let schedule = self
            .ir
            .schedule
            .as_ref()
            .expect("Simulator::new always schedules its IR")
            .clone();
        for idx in schedule {
            let gate = self.ir.gates[idx as usize];
            let value = self.gate_output(&gate);
            self.nets[usize::from(gate.output())] = value;
        }
        Ok(())
    }

    /// Advances sequential state by one clock cycle: sample every DFF's
    /// next `q` from the pre-tick net state, commit all of them, then
    /// resettle combinational outputs (spec §4.F, §5 "all samples happen
    /// before any commit").
    pub fn tick(&mut self) -> Result<()> {
        let mut pending = Vec::with_capacity(self.ir.dffs.len());
        for dff in &self.ir.dffs {
            let d = self.nets[usize::from(dff.d)];
            let q = self.nets[usize::from(dff.q)];
            let en = dff.en.map(|w| self.nets[usize::from(w)]).unwrap_or(self.lane_mask);
            let rst = dff.rst.map(|w| self.nets[usize::from(w)]).unwrap_or(W::zero());
            let reset_fill = if dff.reset_value {
                self.lane_mask
            } else {
                W::zero()
            };
            let gated = en.mux(d, q, self.lane_mask);
            let next = rst.mux(reset_fill, gated, self.lane_mask);
            pending.push((dff.q, next));
        }
        for (q, value) in pending {
            self.nets[usize::from(q)] = value;
        }
        debug!(dffs = self.ir.dffs.len(), "tick committed");
        self.evaluate()
    }

    /// Zeroes every net, applies each DFF's `reset_value` to its `q`
    /// (across all active lanes), then resettles (spec §4.F).
    pub fn reset(&mut self) -> Result<()> {
        for net in &mut self.nets {
            *net = W::zero();
        }
        for dff in &self.ir.dffs {
            let fill = if dff.reset_value {
                self.lane_mask
            } else {
                W::zero()
            };
            self.nets[usize::from(dff.q)] = fill;
        }
        self.evaluate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::ScalarWord;
    use hdlcore::{Dff, Netlist};

    fn half_adder() -> Netlist {
        let a = NetId::new(0);
        let b = NetId::new(1);
        let sum = NetId::new(2);
        let cout = NetId::new(3);
        Netlist::new(
            "half_adder",
            4,
            vec![("a".into(), vec![a]), ("b".into(), vec![b])],
            vec![("sum".into(), vec![sum]), ("cout".into(), vec![cout])],
            vec![Gate::Xor { a, b, out: sum }, Gate::And { a, b, out: cout }],
            vec![],
        )
    }

    #[test]
    fn half_adder_s1() {
        let mut sim = Simulator::<ScalarWord>::new(half_adder(), 1, false).unwrap();
        sim.poke_scalar("a", 0, 1).unwrap();
        sim.poke_scalar("b", 0, 1).unwrap();
        sim.evaluate().unwrap();
        assert_eq!(sim.peek_scalar("sum", 0).unwrap(), 0);
        assert_eq!(sim.peek_scalar("cout", 0).unwrap(), 1);

        sim.poke_scalar("a", 0, 1).unwrap();
        sim.poke_scalar("b", 0, 0).unwrap();
        sim.evaluate().unwrap();
        assert_eq!(sim.peek_scalar("sum", 0).unwrap(), 1);
        assert_eq!(sim.peek_scalar("cout", 0).unwrap(), 0);
    }

    #[test]
    fn lane_packing_s6() {
        // 1-bit XOR, 64 lanes.
        let a = NetId::new(0);
        let b = NetId::new(1);
        let y = NetId::new(2);
        let ir = Netlist::new(
            "xor1",
            3,
            vec![("a".into(), vec![a]), ("b".into(), vec![b])],
            vec![("y".into(), vec![y])],
            vec![Gate::Xor { a, b, out: y }],
            vec![],
        );
        let mut sim = Simulator::<ScalarWord>::new(ir, 64, false).unwrap();
        sim.poke("a", &[ScalarWord::from_lanes(0xAAAAAAAAAAAAAAAA)]).unwrap();
        sim.poke("b", &[ScalarWord::from_lanes(0x5555555555555555)]).unwrap();
        sim.evaluate().unwrap();
        let y_words = sim.peek("y").unwrap();
        assert_eq!(y_words[0].to_lanes(64), 0xFFFFFFFFFFFFFFFF);
    }

    #[test]
    fn evaluate_is_idempotent() {
        let mut sim = Simulator::<ScalarWord>::new(half_adder(), 4, false).unwrap();
        sim.poke_scalar("a", 0, 1).unwrap();
        sim.poke_scalar("b", 0, 1).unwrap();
        sim.evaluate().unwrap();
        let first = sim.peek("sum").unwrap();
        sim.evaluate().unwrap();
        let second = sim.peek("sum").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn two_dff_race_s5() {
        // DFF1: d = q2, DFF2: d = q1, both initialized to (q1=0, q2=1).
        let q1 = NetId::new(0);
        let q2 = NetId::new(1);
        let ir = Netlist::new(
            "race",
            2,
            vec![],
            vec![("q1".into(), vec![q1]), ("q2".into(), vec![q2])],
            vec![],
            vec![
                Dff {
                    d: q2,
                    q: q1,
                    rst: None,
                    en: None,
                    async_reset: false,
                    reset_value: false,
                },
                Dff {
                    d: q1,
                    q: q2,
                    rst: None,
                    en: None,
                    async_reset: false,
                    reset_value: true,
                },
            ],
        );
        let mut sim = Simulator::<ScalarWord>::new(ir, 1, false).unwrap();
        sim.reset().unwrap();
        assert_eq!(sim.peek_scalar("q1", 0).unwrap(), 0);
        assert_eq!(sim.peek_scalar("q2", 0).unwrap(), 1);

        sim.tick().unwrap();
        assert_eq!(sim.peek_scalar("q1", 0).unwrap(), 1);
        assert_eq!(sim.peek_scalar("q2", 0).unwrap(), 0);
    }

    #[test]
    fn sync_reset_overrides_data_on_tick() {
        let d = NetId::new(0);
        let rst = NetId::new(1);
        let q = NetId::new(2);
        let ir = Netlist::new(
            "reset_test",
            3,
            vec![("d".into(), vec![d]), ("rst".into(), vec![rst])],
            vec![("q".into(), vec![q])],
            vec![],
            vec![Dff {
                d,
                q,
                rst: Some(rst),
                en: None,
                async_reset: false,
                reset_value: false,
            }],
        );
        let mut sim = Simulator::<ScalarWord>::new(ir, 1, false).unwrap();
        sim.poke_scalar("d", 0, 1).unwrap();
        sim.poke_scalar("rst", 0, 1).unwrap();
        sim.tick().unwrap();
        assert_eq!(sim.peek_scalar("q", 0).unwrap(), 0);
    }

    #[test]
    fn poke_unknown_port_is_an_error() {
        let mut sim = Simulator::<ScalarWord>::new(half_adder(), 1, false).unwrap();
        let err = sim.poke_scalar("nope", 0, 0).unwrap_err();
        assert!(matches!(err, Error::UnknownPort { .. }));
    }

    #[test]
    fn lane_index_out_of_range_is_an_error() {
        let mut sim = Simulator::<ScalarWord>::new(half_adder(), 4, false).unwrap();
        let err = sim.poke_scalar("a", 4, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidWidth { .. }));
    }
}
