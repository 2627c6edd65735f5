//! Benchmarks for the bit-parallel evaluator's `evaluate`/`tick` hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hdlcore::{Dff, Gate, NetId, Netlist};
use hdlcore_eval::{ScalarWord, Simulator};

fn ripple_adder_ir(width: u32) -> Netlist {
    let mut next_net = 0u32;
    let mut alloc = || {
        let id = NetId::new(next_net);
        next_net += 1;
        id
    };
    let a: Vec<_> = (0..width).map(|_| alloc()).collect();
    let b: Vec<_> = (0..width).map(|_| alloc()).collect();
    let mut sum = Vec::with_capacity(width as usize);
    let mut gates = Vec::new();
    let mut carry = alloc();
    gates.push(Gate::Const {
        value: false,
        out: carry,
    });
    for i in 0..width as usize {
        let axb = alloc();
        gates.push(Gate::Xor {
            a: a[i],
            b: b[i],
            out: axb,
        });
        let s = alloc();
        gates.push(Gate::Xor {
            a: axb,
            b: carry,
            out: s,
        });
        sum.push(s);
        let and1 = alloc();
        gates.push(Gate::And {
            a: a[i],
            b: b[i],
            out: and1,
        });
        let and2 = alloc();
        gates.push(Gate::And {
            a: axb,
            b: carry,
            out: and2,
        });
        let next_carry = alloc();
        gates.push(Gate::Or {
            a: and1,
            b: and2,
            out: next_carry,
        });
        carry = next_carry;
    }
    Netlist::new(
        "ripple_adder",
        next_net,
        vec![
            ("a".into(), a.clone()),
            ("b".into(), b.clone()),
        ],
        vec![("sum".into(), sum), ("cout".into(), vec![carry])],
        gates,
        Vec::<Dff>::new(),
    )
}

/// `HDLCORE_LANES` lets a benchmark run be repointed at a different lane
/// count without editing the source; unset or malformed falls back to 64.
fn configured_lanes() -> u32 {
    std::env::var("HDLCORE_LANES").ok().and_then(|raw| raw.parse().ok()).filter(|&lanes| lanes >= 1).unwrap_or(64)
}

fn bench_evaluate_64bit_adder(c: &mut Criterion) {
    let lanes = configured_lanes();
    let ir = ripple_adder_ir(64);
    let mut sim = Simulator::<ScalarWord>::new(ir, lanes, false).unwrap();
    c.bench_function("evaluate_64bit_adder", |bencher| {
        bencher.iter(|| {
            sim.evaluate().unwrap();
            black_box(&sim);
        });
    });
}

fn bench_poke_peek_roundtrip(c: &mut Criterion) {
    let lanes = configured_lanes();
    let ir = ripple_adder_ir(32);
    let mut sim = Simulator::<ScalarWord>::new(ir, lanes, false).unwrap();
    c.bench_function("poke_evaluate_peek_32bit_adder", |bencher| {
        bencher.iter(|| {
            sim.poke_scalar("a", black_box(0), black_box(0xDEAD_BEEF)).unwrap();
            sim.poke_scalar("b", black_box(0), black_box(0x1234_5678)).unwrap();
            sim.evaluate().unwrap();
            black_box(sim.peek_scalar("sum", 0).unwrap());
        });
    });
}

criterion_group!(benches, bench_evaluate_64bit_adder, bench_poke_peek_roundtrip);
criterion_main!(benches);
