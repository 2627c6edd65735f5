//! Sample circuits used to exercise the full pipeline end to end: declared
//! once as behavioral components, then lowered, scheduled, and evaluated
//! structurally. Not part of the public contract of any other crate —
//! these exist for integration tests and doctests (spec.md §8 scenarios).

use std::collections::HashMap;

use hdlcore::{Netlist, Result};
use hdlcore_behavioral::{Assignment, Behavior, BehavioralSimulator, BinOp, Component, Expr, Port, ResetConfig};
use hdlcore_eval::{ScalarWord, Simulator};
use hdlcore_lower::lower;
use hdlcore_signal::WireId;

/// A behavioral component (or small set of them) already added to a
/// [`BehavioralSimulator`], with its externally visible ports named so the
/// same circuit can be lowered to a [`Netlist`] and driven structurally.
pub struct DemoCircuit {
    pub name: &'static str,
    component_ids: Vec<usize>,
    pub inputs: Vec<(String, WireId)>,
    pub outputs: Vec<(String, WireId)>,
    pub clock: Option<WireId>,
}

impl DemoCircuit {
    /// Lowers this circuit's components out of `sim` into a scheduled
    /// [`Netlist`].
    pub fn lower(&self, sim: &BehavioralSimulator) -> Result<Netlist> {
        let components: Vec<Component> = self
            .component_ids
            .iter()
            .map(|&id| sim.component(id).clone())
            .collect();
        lower(self.name, &components, &self.inputs, &self.outputs)
    }

    /// Lowers and builds a bit-parallel structural simulator at `lanes`
    /// lanes, initial nets zeroed.
    pub fn structural(&self, sim: &BehavioralSimulator, lanes: u32) -> Result<Simulator<ScalarWord>> {
        let ir = self.lower(sim)?;
        Simulator::<ScalarWord>::new(ir, lanes, false)
    }
}

fn signal(name: &str) -> Expr {
    Expr::Signal(name.to_string())
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// A single-bit half-adder: `sum = a ^ b`, `cout = a & b` (spec.md S1).
pub fn half_adder(sim: &mut BehavioralSimulator) -> DemoCircuit {
    let a = sim.bus.alloc("a", 1).unwrap();
    let b = sim.bus.alloc("b", 1).unwrap();
    let sum = sim.bus.alloc("sum", 1).unwrap();
    let cout = sim.bus.alloc("cout", 1).unwrap();

    let mut wires = HashMap::new();
    wires.insert("a".to_string(), a);
    wires.insert("b".to_string(), b);
    wires.insert("sum".to_string(), sum);
    wires.insert("cout".to_string(), cout);

    let component = Component::new(
        "half_adder",
        vec![Port::new("a", 1), Port::new("b", 1)],
        vec![Port::new("sum", 1), Port::new("cout", 1)],
        vec![],
        Behavior::Combinational {
            assigns: vec![
                Assignment::new("sum", binary(BinOp::Xor, signal("a"), signal("b"))),
                Assignment::new("cout", binary(BinOp::And, signal("a"), signal("b"))),
            ],
        },
        wires,
    );
    let id = sim.add_component(component);
    DemoCircuit {
        name: "half_adder",
        component_ids: vec![id],
        inputs: vec![("a".to_string(), a), ("b".to_string(), b)],
        outputs: vec![("sum".to_string(), sum), ("cout".to_string(), cout)],
        clock: None,
    }
}

/// A `width`-bit ripple-carry adder with a carry-in and overflow flag
/// (spec.md S2), built as one combinational component using the
/// expression AST's arithmetic ops (lowered to gates by `hdlcore-lower`'s
/// `ripple_adder` emitter) plus a named intermediate (`ext_sum`) for the
/// width-extended sum both `sum` and `cout` read from.
pub fn ripple_adder(sim: &mut BehavioralSimulator, width: u32) -> DemoCircuit {
    let a = sim.bus.alloc("a", width).unwrap();
    let b = sim.bus.alloc("b", width).unwrap();
    let cin = sim.bus.alloc("cin", 1).unwrap();
    let sum = sim.bus.alloc("sum", width).unwrap();
    let cout = sim.bus.alloc("cout", 1).unwrap();
    let overflow = sim.bus.alloc("overflow", 1).unwrap();
    let ext_width = width + 1;
    let ext_sum_wire = sim.bus.alloc("ext_sum", ext_width).unwrap();

    let mut wires = HashMap::new();
    wires.insert("a".to_string(), a);
    wires.insert("b".to_string(), b);
    wires.insert("cin".to_string(), cin);
    wires.insert("sum".to_string(), sum);
    wires.insert("cout".to_string(), cout);
    wires.insert("overflow".to_string(), overflow);
    wires.insert("ext_sum".to_string(), ext_sum_wire);

    let ext_sum = Expr::Binary {
        op: BinOp::Add,
        lhs: Box::new(Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::ZeroExtend {
                value: Box::new(signal("a")),
                width: ext_width,
            }),
            rhs: Box::new(Expr::ZeroExtend {
                value: Box::new(signal("b")),
                width: ext_width,
            }),
        }),
        rhs: Box::new(Expr::ZeroExtend {
            value: Box::new(signal("cin")),
            width: ext_width,
        }),
    };

    let sign_a = Expr::Index {
        base: Box::new(signal("a")),
        bit: width - 1,
    };
    let sign_b = Expr::Index {
        base: Box::new(signal("b")),
        bit: width - 1,
    };
    let sign_sum = Expr::Index {
        base: Box::new(signal("sum")),
        bit: width - 1,
    };
    let overflow_expr = binary(BinOp::And, binary(BinOp::Eq, sign_a.clone(), sign_b), binary(BinOp::Ne, sign_sum, sign_a));

    let component = Component::new(
        "ripple_adder",
        vec![Port::new("a", width), Port::new("b", width), Port::new("cin", 1)],
        vec![Port::new("sum", width), Port::new("cout", 1), Port::new("overflow", 1)],
        vec![Port::new("ext_sum", ext_width)],
        Behavior::Combinational {
            assigns: vec![
                Assignment::new("ext_sum", ext_sum),
                Assignment::new(
                    "sum",
                    Expr::Slice {
                        base: Box::new(signal("ext_sum")),
                        hi: width - 1,
                        lo: 0,
                    },
                ),
                Assignment::new(
                    "cout",
                    Expr::Index {
                        base: Box::new(signal("ext_sum")),
                        bit: width,
                    },
                ),
                Assignment::new("overflow", overflow_expr),
            ],
        },
        wires,
    );
    let id = sim.add_component(component);
    DemoCircuit {
        name: "ripple_adder",
        component_ids: vec![id],
        inputs: vec![
            ("a".to_string(), a),
            ("b".to_string(), b),
            ("cin".to_string(), cin),
        ],
        outputs: vec![
            ("sum".to_string(), sum),
            ("cout".to_string(), cout),
            ("overflow".to_string(), overflow),
        ],
        clock: None,
    }
}

/// A `width`-bit ALU (spec.md S3): a 2-bit `op` selects `ADD` (0),
/// `SUB` (1), or `AND` (2, default for any other encoding) of `a`/`b`,
/// plus a `zero` flag asserted whenever `result` is all-zero bits. Built
/// with [`Expr::Select`] the same way `hdlcore_lower::builder`'s
/// `select_tree` picks among cases by a selector value with a default.
pub fn alu(sim: &mut BehavioralSimulator, width: u32) -> DemoCircuit {
    let a = sim.bus.alloc("a", width).unwrap();
    let b = sim.bus.alloc("b", width).unwrap();
    let op = sim.bus.alloc("op", 2).unwrap();
    let result = sim.bus.alloc("result", width).unwrap();
    let zero = sim.bus.alloc("zero", 1).unwrap();

    let mut wires = HashMap::new();
    wires.insert("a".to_string(), a);
    wires.insert("b".to_string(), b);
    wires.insert("op".to_string(), op);
    wires.insert("result".to_string(), result);
    wires.insert("zero".to_string(), zero);

    let result_expr = Expr::Select {
        selector: Box::new(signal("op")),
        cases: vec![
            (0, binary(BinOp::Add, signal("a"), signal("b"))),
            (1, binary(BinOp::Sub, signal("a"), signal("b"))),
        ],
        default: Box::new(binary(BinOp::And, signal("a"), signal("b"))),
    };
    let zero_expr = binary(BinOp::Eq, signal("result"), Expr::Const { width, value: 0 });

    let component = Component::new(
        "alu",
        vec![Port::new("a", width), Port::new("b", width), Port::new("op", 2)],
        vec![Port::new("result", width), Port::new("zero", 1)],
        vec![],
        Behavior::Combinational {
            assigns: vec![Assignment::new("result", result_expr), Assignment::new("zero", zero_expr)],
        },
        wires,
    );
    let id = sim.add_component(component);
    DemoCircuit {
        name: "alu",
        component_ids: vec![id],
        inputs: vec![("a".to_string(), a), ("b".to_string(), b), ("op".to_string(), op)],
        outputs: vec![("result".to_string(), result), ("zero".to_string(), zero)],
        clock: None,
    }
}

/// A `width`-bit up-counter with synchronous reset and enable (spec.md
/// S4): `count' = rst ? 0 : (en ? count + 1 : count)`, plus an
/// `overflow` flag asserted the cycle before wraparound.
pub fn counter(sim: &mut BehavioralSimulator, width: u32) -> DemoCircuit {
    let clk = sim.bus.alloc("clk", 1).unwrap();
    let rst = sim.bus.alloc("rst", 1).unwrap();
    let en = sim.bus.alloc("en", 1).unwrap();
    let count = sim.bus.alloc("count", width).unwrap();
    let overflow = sim.bus.alloc("overflow", 1).unwrap();

    let mut wires = HashMap::new();
    wires.insert("clk".to_string(), clk);
    wires.insert("rst".to_string(), rst);
    wires.insert("en".to_string(), en);
    wires.insert("count".to_string(), count);
    wires.insert("overflow".to_string(), overflow);

    let all_ones = Expr::Const {
        width,
        value: (1u64 << width) - 1,
    };
    let next_count = Expr::Select {
        selector: Box::new(signal("en")),
        cases: vec![(
            1,
            binary(BinOp::Add, signal("count"), Expr::Const { width, value: 1 }),
        )],
        default: Box::new(signal("count")),
    };

    let component = Component::new(
        "counter",
        vec![Port::new("rst", 1), Port::new("en", 1)],
        vec![Port::new("count", width)],
        vec![],
        Behavior::Sequential {
            clock: clk,
            reset: Some(ResetConfig {
                signal: rst,
                asynchronous: false,
                reset_values: vec![("count".to_string(), 0)],
            }),
            assigns: vec![Assignment::new("count", next_count)],
        },
        wires.clone(),
    );
    let seq_id = sim.add_component(component);

    let overflow_component = Component::new(
        "counter_overflow",
        vec![Port::new("count", width)],
        vec![Port::new("overflow", 1)],
        vec![],
        Behavior::Combinational {
            assigns: vec![Assignment::new("overflow", binary(BinOp::Eq, signal("count"), all_ones))],
        },
        wires,
    );
    let comb_id = sim.add_component(overflow_component);
    sim.add_clock(clk, 1);

    DemoCircuit {
        name: "counter",
        component_ids: vec![seq_id, comb_id],
        inputs: vec![("rst".to_string(), rst), ("en".to_string(), en)],
        outputs: vec![("count".to_string(), count), ("overflow".to_string(), overflow)],
        clock: Some(clk),
    }
}

/// Two DFFs that swap each other's state every tick: `d1 = q2`, `d2 = q1`,
/// initialized to `(q1, q2) = (0, 1)` — direct proof of sample-before-commit
/// (spec.md S5).
///
/// Neither DFF has a real reset input (`q1`/`q2` are outputs only, so
/// there is no external port a caller could `poke` to drive one), but the
/// asymmetric initial state `(0, 1)` still has to reach the lowered
/// structural netlist somehow. Each component gets a `power_on` port tied
/// to a dedicated internal wire that is never driven away from 0, purely
/// so its declared per-DFF `reset_value` carries the intended starting
/// state through to `Dff::reset_value` — `Simulator::reset` applies it,
/// `Simulator::tick` never sees `power_on` asserted so it has no bearing
/// on steady-state behavior.
pub fn two_dff_race(sim: &mut BehavioralSimulator) -> DemoCircuit {
    let clk = sim.bus.alloc("clk", 1).unwrap();
    let q1 = sim.bus.alloc("q1", 1).unwrap();
    let q2 = sim.bus.alloc("q2", 1).unwrap();
    let power_on = sim.bus.alloc("two_dff_race.power_on", 1).unwrap();
    sim.bus.set(q1, 0);
    sim.bus.set(q2, 1);

    let mut w1 = HashMap::new();
    w1.insert("q".to_string(), q1);
    w1.insert("d".to_string(), q2);
    w1.insert("power_on".to_string(), power_on);
    let dff1 = Component::new(
        "dff1",
        vec![Port::new("d", 1)],
        vec![Port::new("q", 1)],
        vec![Port::new("power_on", 1)],
        Behavior::Sequential {
            clock: clk,
            reset: Some(ResetConfig {
                signal: power_on,
                asynchronous: false,
                reset_values: vec![("q".to_string(), 0)],
            }),
            assigns: vec![Assignment::new("q", signal("d"))],
        },
        w1,
    );

    let mut w2 = HashMap::new();
    w2.insert("q".to_string(), q2);
    w2.insert("d".to_string(), q1);
    w2.insert("power_on".to_string(), power_on);
    let dff2 = Component::new(
        "dff2",
        vec![Port::new("d", 1)],
        vec![Port::new("q", 1)],
        vec![Port::new("power_on", 1)],
        Behavior::Sequential {
            clock: clk,
            reset: Some(ResetConfig {
                signal: power_on,
                asynchronous: false,
                reset_values: vec![("q".to_string(), 1)],
            }),
            assigns: vec![Assignment::new("q", signal("d"))],
        },
        w2,
    );

    let id1 = sim.add_component(dff1);
    let id2 = sim.add_component(dff2);
    sim.add_clock(clk, 1);

    DemoCircuit {
        name: "two_dff_race",
        component_ids: vec![id1, id2],
        inputs: vec![],
        outputs: vec![("q1".to_string(), q1), ("q2".to_string(), q2)],
        clock: Some(clk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_adder_structural_matches_s1() {
        let mut sim = BehavioralSimulator::new();
        let circuit = half_adder(&mut sim);
        let mut structural = circuit.structural(&sim, 1).unwrap();
        structural.poke_scalar("a", 0, 1).unwrap();
        structural.poke_scalar("b", 0, 1).unwrap();
        structural.evaluate().unwrap();
        assert_eq!(structural.peek_scalar("sum", 0).unwrap(), 0);
        assert_eq!(structural.peek_scalar("cout", 0).unwrap(), 1);
    }

    #[test]
    fn ripple_adder_structural_matches_s2() {
        let mut sim = BehavioralSimulator::new();
        let circuit = ripple_adder(&mut sim, 8);
        let mut structural = circuit.structural(&sim, 1).unwrap();

        structural.poke_scalar("a", 0, 0xFF).unwrap();
        structural.poke_scalar("b", 0, 0x01).unwrap();
        structural.poke_scalar("cin", 0, 0).unwrap();
        structural.evaluate().unwrap();
        assert_eq!(structural.peek_scalar("sum", 0).unwrap(), 0x00);
        assert_eq!(structural.peek_scalar("cout", 0).unwrap(), 1);
        assert_eq!(structural.peek_scalar("overflow", 0).unwrap(), 0);

        structural.poke_scalar("a", 0, 0x7F).unwrap();
        structural.poke_scalar("b", 0, 0x01).unwrap();
        structural.poke_scalar("cin", 0, 0).unwrap();
        structural.evaluate().unwrap();
        assert_eq!(structural.peek_scalar("sum", 0).unwrap(), 0x80);
        assert_eq!(structural.peek_scalar("cout", 0).unwrap(), 0);
        assert_eq!(structural.peek_scalar("overflow", 0).unwrap(), 1);
    }

    #[test]
    fn counter_wraps_and_flags_overflow_s4() {
        let mut sim = BehavioralSimulator::new();
        let circuit = counter(&mut sim, 4);
        let mut structural = circuit.structural(&sim, 1).unwrap();
        structural.reset().unwrap();
        structural.poke_scalar("en", 0, 1).unwrap();
        structural.poke_scalar("rst", 0, 0).unwrap();

        for _ in 0..15 {
            structural.tick().unwrap();
        }
        assert_eq!(structural.peek_scalar("count", 0).unwrap(), 0xF);
        assert_eq!(structural.peek_scalar("overflow", 0).unwrap(), 1);

        structural.tick().unwrap();
        assert_eq!(structural.peek_scalar("count", 0).unwrap(), 0);
    }

    #[test]
    fn two_dff_race_swaps_structurally_s5() {
        let mut sim = BehavioralSimulator::new();
        let circuit = two_dff_race(&mut sim);
        let ir = circuit.lower(&sim).unwrap();
        let mut structural = Simulator::<ScalarWord>::new(ir, 1, false).unwrap();
        structural.reset().unwrap();
        structural.tick().unwrap();
        assert_eq!(structural.peek_scalar("q1", 0).unwrap(), 1);
        assert_eq!(structural.peek_scalar("q2", 0).unwrap(), 0);
    }
}
