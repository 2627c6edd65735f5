//! CLI demo: builds one of the sample circuits, lowers and schedules it,
//! prints its [`hdlcore::CircuitStats`], and (for sequential circuits)
//! free-runs it on the bit-parallel evaluator for a configurable number
//! of cycles and lanes.

use anyhow::{bail, Context};
use hdlcore::CircuitStats;
use hdlcore_behavioral::BehavioralSimulator;
use hdlcore_eval::{ScalarWord, Simulator};

/// Reads an environment variable as a `u32`, falling back to `default`
/// when unset. A value that parses but isn't `>= 1` or fails to parse at
/// all is a hard error, never a silent fallback to `default`.
fn env_u32(name: &str, default: u32) -> anyhow::Result<u32> {
    match std::env::var(name) {
        Ok(raw) => {
            let value: u32 = raw.parse().with_context(|| format!("{name}=\"{raw}\" is not a valid integer"))?;
            if value < 1 {
                bail!("{name}={value} must be >= 1");
            }
            Ok(value)
        }
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e).with_context(|| format!("reading {name}")),
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <half_adder|ripple_adder|alu|counter|two_dff_race> [width]", args[0]);
        std::process::exit(1);
    }

    let width: u32 = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(8);
    let lanes = env_u32("HDLCORE_LANES", 64)?;
    let cycles = env_u32("HDLCORE_CYCLES", 100)?;

    let mut behavioral = BehavioralSimulator::new();
    let ir = match args[1].as_str() {
        "half_adder" => demo_adder::half_adder(&mut behavioral).lower(&behavioral),
        "ripple_adder" => demo_adder::ripple_adder(&mut behavioral, width).lower(&behavioral),
        "alu" => demo_adder::alu(&mut behavioral, width).lower(&behavioral),
        "counter" => demo_adder::counter(&mut behavioral, width).lower(&behavioral),
        "two_dff_race" => demo_adder::two_dff_race(&mut behavioral).lower(&behavioral),
        other => bail!("unknown circuit `{other}`"),
    }
    .context("lowering failed")?;

    let stats = CircuitStats::compute(&ir);
    println!("circuit: {}", ir.name);
    println!("nets:    {}", ir.net_count());
    println!("gates:   {}", stats.total_gates());
    println!("  AND:   {}", stats.and_count);
    println!("  OR:    {}", stats.or_count);
    println!("  XOR:   {}", stats.xor_count);
    println!("  NOT:   {}", stats.not_count);
    println!("  MUX:   {}", stats.mux_count);
    println!("dffs:    {}", stats.dff_count);

    if !ir.dffs.is_empty() {
        let mut sim = Simulator::<ScalarWord>::new(ir, lanes, false).context("building evaluator")?;
        sim.reset().context("resetting evaluator")?;
        for _ in 0..cycles {
            sim.tick().context("ticking evaluator")?;
        }
        println!("ran {cycles} cycles at {lanes} lanes");
    }

    Ok(())
}
