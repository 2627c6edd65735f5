//! The lowering pass proper: bit-blast, flatten connections, emit
//! primitives, validate (spec §4.D).

use std::collections::HashMap;

use hdlcore::{Error, Locator, NetId, Netlist, Result};
use hdlcore_behavioral::{Behavior, Component};
use hdlcore_signal::WireId;
use tracing::{info_span, warn};

use crate::builder::NetlistBuilder;
use crate::expr::{lower_expr, NetEnv};

/// Lowers a flat list of behavioral components sharing one [`WireId`]
/// address space into a [`Netlist`].
///
/// Connections between components are not a separate step here: two
/// components bound to the same [`WireId`] already share the same net
/// bus once bit-blast has run, which is exactly spec §4.D step 2
/// ("flatten connections: unify nets") — no `BUF` gates are needed for
/// pure wiring.
///
/// `external_inputs`/`external_outputs` name the design's externally
/// visible ports in declaration order; every other `WireId` referenced by
/// a component is treated as purely internal.
pub fn lower(
    name: impl Into<String>,
    components: &[Component],
    external_inputs: &[(String, WireId)],
    external_outputs: &[(String, WireId)],
) -> Result<Netlist> {
    let mut builder = NetlistBuilder::new();
    let mut nets_for_wire: HashMap<WireId, Vec<NetId>> = HashMap::new();
    let mut widths: HashMap<WireId, u32> = HashMap::new();

    // Net indices must be a deterministic function of the design, not of
    // HashMap iteration order (spec §3/§4.C "stable numbering", §6 "byte-
    // identical reproducibility"), so buses are allocated on first sight
    // while walking components and their ports in declaration order.
    for component in components {
        for port in component
            .inputs
            .iter()
            .chain(component.outputs.iter())
            .chain(component.internals.iter())
        {
            if let Some(wire) = component.wire(&port.name) {
                let existing = widths.entry(wire).or_insert(port.width);
                if *existing != port.width {
                    return Err(Error::WidthMismatch {
                        expected: *existing,
                        actual: port.width,
                        locator: Locator::Component(format!("{}.{}", component.path, port.name)),
                    });
                }
                nets_for_wire
                    .entry(wire)
                    .or_insert_with(|| builder.alloc_bus(port.width));
            }
        }
    }

    for component in components {
        let _span = info_span!("lower_component", path = %component.path).entered();
        lower_component(component, &mut nets_for_wire, &mut builder)?;
    }

    let input_ports = resolve_ports(external_inputs, &nets_for_wire)?;
    let output_ports = resolve_ports(external_outputs, &nets_for_wire)?;

    let ir = Netlist::new(
        name,
        builder.net_count,
        input_ports,
        output_ports,
        builder.gates,
        builder.dffs,
    );
    ir.validate()?;
    Ok(ir)
}

fn resolve_ports(
    ports: &[(String, WireId)],
    nets_for_wire: &HashMap<WireId, Vec<NetId>>,
) -> Result<Vec<(String, Vec<NetId>)>> {
    ports
        .iter()
        .map(|(name, wire)| {
            nets_for_wire
                .get(wire)
                .cloned()
                .map(|nets| (name.clone(), nets))
                .ok_or_else(|| Error::UnknownPort {
                    port: name.clone(),
                    locator: Locator::Component(name.clone()),
                })
        })
        .collect()
}

fn env_for(component: &Component, nets_for_wire: &HashMap<WireId, Vec<NetId>>) -> NetEnv {
    let mut env = NetEnv::new();
    for port in component
        .inputs
        .iter()
        .chain(component.outputs.iter())
        .chain(component.internals.iter())
    {
        if let Some(wire) = component.wire(&port.name) {
            if let Some(nets) = nets_for_wire.get(&wire) {
                env.insert(port.name.clone(), nets.clone());
            }
        }
    }
    env
}

fn target_width(component: &Component, target: &str) -> Option<u32> {
    component
        .outputs
        .iter()
        .chain(component.internals.iter())
        .find(|p| p.name == target)
        .map(|p| p.width)
}

fn lower_component(
    component: &Component,
    nets_for_wire: &mut HashMap<WireId, Vec<NetId>>,
    builder: &mut NetlistBuilder,
) -> Result<()> {
    let env = env_for(component, nets_for_wire);

    match &component.behavior {
        Behavior::Combinational { assigns } => {
            for assignment in assigns {
                let computed = lower_expr(&assignment.expr, &env, builder)?;
                let width = target_width(component, &assignment.target).ok_or_else(|| {
                    Error::UnknownPort {
                        port: assignment.target.clone(),
                        locator: Locator::Component(component.path.clone()),
                    }
                })?;
                let wire = component.wire(&assignment.target).ok_or_else(|| Error::UnknownPort {
                    port: assignment.target.clone(),
                    locator: Locator::Component(component.path.clone()),
                })?;
                let target_nets = nets_for_wire
                    .get(&wire)
                    .cloned()
                    .ok_or_else(|| Error::UnknownPort {
                        port: assignment.target.clone(),
                        locator: Locator::Component(component.path.clone()),
                    })?;
                let adjusted = builder.zero_extend(&computed, width);
                for (&src, &dst) in adjusted.iter().zip(target_nets.iter()) {
                    builder.drive(src, dst);
                }
            }
        }
        Behavior::Sequential {
            reset, assigns, ..
        } => {
            let reset_signal = reset.as_ref().map(|r| {
                nets_for_wire
                    .get(&r.signal)
                    .and_then(|nets| nets.first().copied())
            });
            let rst_net = match reset_signal {
                Some(Some(net)) => Some(net),
                Some(None) => {
                    warn!(component = %component.path, "reset signal has no allocated net");
                    None
                }
                None => None,
            };
            let async_reset = reset.as_ref().map(|r| r.asynchronous).unwrap_or(false);

            for assignment in assigns {
                let computed = lower_expr(&assignment.expr, &env, builder)?;
                let width = target_width(component, &assignment.target).ok_or_else(|| {
                    Error::UnknownPort {
                        port: assignment.target.clone(),
                        locator: Locator::Component(component.path.clone()),
                    }
                })?;
                let wire = component.wire(&assignment.target).ok_or_else(|| Error::UnknownPort {
                    port: assignment.target.clone(),
                    locator: Locator::Component(component.path.clone()),
                })?;
                let q_nets = nets_for_wire
                    .get(&wire)
                    .cloned()
                    .ok_or_else(|| Error::UnknownPort {
                        port: assignment.target.clone(),
                        locator: Locator::Component(component.path.clone()),
                    })?;
                let adjusted = builder.zero_extend(&computed, width);
                let reset_values: Vec<bool> = reset
                    .as_ref()
                    .and_then(|r| r.reset_values.iter().find(|(name, _)| name == &assignment.target))
                    .map(|(_, value)| bit_vec(*value, width))
                    .unwrap_or_else(|| vec![false; width as usize]);
                builder.register_into(&adjusted, &q_nets, rst_net, None, async_reset, &reset_values);
            }
        }
    }
    Ok(())
}

fn bit_vec(value: u64, width: u32) -> Vec<bool> {
    (0..width).map(|i| (value >> i) & 1 != 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdlcore_behavioral::{Assignment, BinOp, Expr, Port};
    use hdlcore_signal::SignalBus;
    use std::collections::HashMap as Map;

    #[test]
    fn lowers_half_adder_to_two_gates() {
        let mut bus = SignalBus::new();
        let a = bus.alloc("a", 1).unwrap();
        let b = bus.alloc("b", 1).unwrap();
        let sum = bus.alloc("sum", 1).unwrap();
        let cout = bus.alloc("cout", 1).unwrap();

        let mut wires = Map::new();
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
                    Assignment::new(
                        "sum",
                        Expr::Binary {
                            op: BinOp::Xor,
                            lhs: Box::new(Expr::Signal("a".into())),
                            rhs: Box::new(Expr::Signal("b".into())),
                        },
                    ),
                    Assignment::new(
                        "cout",
                        Expr::Binary {
                            op: BinOp::And,
                            lhs: Box::new(Expr::Signal("a".into())),
                            rhs: Box::new(Expr::Signal("b".into())),
                        },
                    ),
                ],
            },
            wires,
        );

        let ir = lower(
            "half_adder",
            &[component],
            &[("a".into(), a), ("b".into(), b)],
            &[("sum".into(), sum), ("cout".into(), cout)],
        )
        .unwrap();

        ir.validate().unwrap();
        assert_eq!(ir.input_port("a").unwrap().len(), 1);
        assert_eq!(ir.output_port("sum").unwrap().len(), 1);
        assert!(!ir.gates.is_empty());
    }

    #[test]
    fn lowers_two_dff_race_with_shared_q_nets() {
        let mut bus = SignalBus::new();
        let clk = bus.alloc("clk", 1).unwrap();
        let q1 = bus.alloc("q1", 1).unwrap();
        let q2 = bus.alloc("q2", 1).unwrap();

        let mut w1 = Map::new();
        w1.insert("q".to_string(), q1);
        w1.insert("d".to_string(), q2);
        let dff1 = Component::new(
            "dff1",
            vec![Port::new("d", 1)],
            vec![Port::new("q", 1)],
            vec![],
            Behavior::Sequential {
                clock: clk,
                reset: None,
                assigns: vec![Assignment::new("q", Expr::Signal("d".into()))],
            },
            w1,
        );

        let mut w2 = Map::new();
        w2.insert("q".to_string(), q2);
        w2.insert("d".to_string(), q1);
        let dff2 = Component::new(
            "dff2",
            vec![Port::new("d", 1)],
            vec![Port::new("q", 1)],
            vec![],
            Behavior::Sequential {
                clock: clk,
                reset: None,
                assigns: vec![Assignment::new("q", Expr::Signal("d".into()))],
            },
            w2,
        );

        let ir = lower(
            "two_dff_race",
            &[dff1, dff2],
            &[],
            &[("q1".into(), q1), ("q2".into(), q2)],
        )
        .unwrap();

        ir.validate().unwrap();
        assert_eq!(ir.dffs.len(), 2);
        assert_eq!(ir.gates.len(), 0);
    }
}
