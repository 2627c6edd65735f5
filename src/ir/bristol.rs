//! Bristol-style plaintext export of a netlist's gate list.
//!
//! This is a debugging/interop convenience, distinct from the canonical
//! JSON contract in [`super::json`] — not part of the external interface,
//! just a `Display` impl a reader can diff by eye.

use std::fmt;

use super::netlist::Netlist;

/// Wraps a [`Netlist`] so it can be formatted Bristol-style:
/// `<n_inputs> <output> <gate>` per gate, one line per gate, in declaration
/// order (not schedule order — this is for reading, not replay).
pub struct Bristol<'a>(pub &'a Netlist);

impl fmt::Display for Bristol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ir = self.0;
        writeln!(f, "{} {}", ir.gates.len() + ir.dffs.len(), ir.net_count())?;
        writeln!(f, "{} {}", ir.inputs().len(), ir.outputs().len())?;
        for gate in &ir.gates {
            let inputs: Vec<String> = gate.inputs().map(|n| n.to_string()).collect();
            write!(f, "{} 1 {}", inputs.len(), inputs.join(" "))?;
            write!(f, " {} {}", gate.output(), gate.tag())?;
            if let Some(value) = gate.const_value() {
                write!(f, " {}", value as u8)?;
            }
            writeln!(f)?;
        }
        for dff in &ir.dffs {
            write_dff_line(f, dff)?;
        }
        Ok(())
    }
}

fn write_dff_line(f: &mut fmt::Formatter<'_>, dff: &super::gate::Dff) -> fmt::Result {
    write!(f, "1 1 {} {} DFF", dff.d, dff.q)?;
    match dff.rst {
        Some(rst) => write!(f, " rst={rst}")?,
        None => write!(f, " rst=-")?,
    }
    match dff.en {
        Some(en) => write!(f, " en={en}")?,
        None => write!(f, " en=-")?,
    }
    writeln!(
        f,
        " async_reset={} reset_value={}",
        dff.async_reset as u8, dff.reset_value as u8
    )
}
