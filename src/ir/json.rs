//! Deterministic JSON-shaped serialization of the Netlist IR (spec §6).
//!
//! Producers MUST emit keys and arrays in the exact order shown in §6's
//! grammar; this is the bit-exact reproducibility contract. We hand-roll the
//! writer rather than hand the IR to `serde_json::to_string` so that key
//! order never depends on a `HashMap`'s iteration order, and so adding a
//! field to `Netlist` later can't silently reorder the document. The reader
//! side is deliberately more permissive (per §6 "consumers MUST accept
//! fields in any order") and goes through `serde_json::Value`.
//! The workspace enables `serde_json`'s `preserve_order` feature so that
//! `Value::Object` keeps the `inputs`/`outputs` port-map keys in document
//! order (an `IndexMap` instead of the default `BTreeMap`, which would
//! silently re-sort ports alphabetically) — without it, parsing would
//! reorder any netlist whose port names aren't already alphabetical, even
//! though the `gates`/`dffs` arrays are plain JSON arrays and always keep
//! their order regardless of this feature.

use std::fmt::Write as _;

use serde_json::Value;

use crate::error::{Error, Locator, Result};

use super::gate::{Dff, Gate, TAG_AND, TAG_BUF, TAG_CONST, TAG_MUX, TAG_NOT, TAG_OR, TAG_XOR};
use super::net::NetId;
use super::netlist::Netlist;

/// Serializes `ir` to the canonical document described in spec §6.
///
/// The output is byte-identical across runs and platforms for identical
/// in-memory IR: keys are emitted in declaration order (never sorted
/// alphabetically — the grammar's order IS the canonical order), and
/// integers use plain decimal formatting.
pub fn to_canonical_json(ir: &Netlist) -> String {
    let mut out = String::new();
    out.push('{');

    write_str_field(&mut out, "name", &ir.name);
    out.push(',');
    write_raw_field(&mut out, "net_count", &ir.net_count().to_string());
    out.push(',');

    write_key(&mut out, "inputs");
    write_port_map(&mut out, ir.inputs());
    out.push(',');

    write_key(&mut out, "outputs");
    write_port_map(&mut out, ir.outputs());
    out.push(',');

    write_key(&mut out, "gates");
    write_gates(&mut out, &ir.gates);
    out.push(',');

    write_key(&mut out, "dffs");
    write_dffs(&mut out, &ir.dffs);

    out.push('}');
    out
}

fn write_key(out: &mut String, key: &str) {
    let _ = write!(out, "\"{key}\":");
}

fn write_str_field(out: &mut String, key: &str, value: &str) {
    write_key(out, key);
    write_json_string(out, value);
}

fn write_raw_field(out: &mut String, key: &str, raw: &str) {
    write_key(out, key);
    out.push_str(raw);
}

fn write_json_string(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_net_array(out: &mut String, nets: &[NetId]) {
    out.push('[');
    for (i, net) in nets.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{net}");
    }
    out.push(']');
}

fn write_port_map(out: &mut String, ports: &[(String, Vec<NetId>)]) {
    out.push('{');
    for (i, (name, nets)) in ports.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_json_string(out, name);
        out.push(':');
        write_net_array(out, nets);
    }
    out.push('}');
}

fn write_gates(out: &mut String, gates: &[Gate]) {
    out.push('[');
    for (i, gate) in gates.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('{');
        write_str_field(out, "type", gate.tag());
        out.push(',');
        write_key(out, "inputs");
        let inputs: Vec<NetId> = gate.inputs().collect();
        write_net_array(out, &inputs);
        out.push(',');
        write_key(out, "output");
        let _ = write!(out, "{}", gate.output());
        if let Some(value) = gate.const_value() {
            out.push(',');
            write_raw_field(out, "value", if value { "1" } else { "0" });
        }
        out.push('}');
    }
    out.push(']');
}

fn write_dffs(out: &mut String, dffs: &[Dff]) {
    out.push('[');
    for (i, dff) in dffs.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('{');
        write_key(out, "d");
        let _ = write!(out, "{}", dff.d);
        out.push(',');
        write_key(out, "q");
        let _ = write!(out, "{}", dff.q);
        out.push(',');
        write_key(out, "rst");
        match dff.rst {
            Some(rst) => {
                let _ = write!(out, "{rst}");
            }
            None => out.push_str("null"),
        }
        out.push(',');
        write_key(out, "en");
        match dff.en {
            Some(en) => {
                let _ = write!(out, "{en}");
            }
            None => out.push_str("null"),
        }
        out.push(',');
        write_raw_field(
            out,
            "async_reset",
            if dff.async_reset { "true" } else { "false" },
        );
        out.push(',');
        write_raw_field(out, "reset_value", if dff.reset_value { "1" } else { "0" });
        out.push('}');
    }
    out.push(']');
}

/// Parses a document produced by [`to_canonical_json`] (or any conforming
/// producer) back into a [`Netlist`]. Field order in the input is not
/// required, per §6.
pub fn from_json(text: &str) -> Result<Netlist> {
    let root: Value = serde_json::from_str(text).map_err(|e| Error::UnsupportedPrimitive {
        what: format!("malformed netlist JSON: {e}"),
        locator: Locator::Unknown,
    })?;

    let locator = || Locator::Unknown;
    let obj = root.as_object().ok_or_else(|| Error::UnsupportedPrimitive {
        what: "netlist document must be a JSON object".into(),
        locator: locator(),
    })?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| missing_field("name"))?
        .to_string();

    let net_count = obj
        .get("net_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| missing_field("net_count"))? as u32;

    let inputs = parse_port_map(obj.get("inputs"))?;
    let outputs = parse_port_map(obj.get("outputs"))?;
    let gates = parse_gates(obj.get("gates"))?;
    let dffs = parse_dffs(obj.get("dffs"))?;

    Ok(Netlist::new(name, net_count, inputs, outputs, gates, dffs))
}

fn missing_field(field: &'static str) -> Error {
    Error::UnsupportedPrimitive {
        what: format!("missing or malformed field `{field}`"),
        locator: Locator::Unknown,
    }
}

fn parse_port_map(value: Option<&Value>) -> Result<Vec<(String, Vec<NetId>)>> {
    let obj = value
        .and_then(Value::as_object)
        .ok_or_else(|| missing_field("inputs/outputs"))?;
    let mut out = Vec::with_capacity(obj.len());
    for (name, nets) in obj {
        let arr = nets.as_array().ok_or_else(|| missing_field("port nets"))?;
        let mut parsed = Vec::with_capacity(arr.len());
        for n in arr {
            let idx = n.as_u64().ok_or_else(|| missing_field("net index"))?;
            parsed.push(NetId::from(idx as u32));
        }
        out.push((name.clone(), parsed));
    }
    Ok(out)
}

fn parse_net_array(value: Option<&Value>) -> Result<Vec<NetId>> {
    let arr = value
        .and_then(Value::as_array)
        .ok_or_else(|| missing_field("inputs"))?;
    arr.iter()
        .map(|n| {
            n.as_u64()
                .map(|v| NetId::from(v as u32))
                .ok_or_else(|| missing_field("net index"))
        })
        .collect()
}

fn parse_gates(value: Option<&Value>) -> Result<Vec<Gate>> {
    let arr = value
        .and_then(Value::as_array)
        .ok_or_else(|| missing_field("gates"))?;
    arr.iter().map(parse_gate).collect()
}

fn parse_gate(value: &Value) -> Result<Gate> {
    let obj = value.as_object().ok_or_else(|| missing_field("gate"))?;
    let tag = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| missing_field("type"))?;
    let inputs = parse_net_array(obj.get("inputs"))?;
    let output = obj
        .get("output")
        .and_then(Value::as_u64)
        .map(|v| NetId::from(v as u32))
        .ok_or_else(|| missing_field("output"))?;

    let nth = |i: usize| -> Result<NetId> {
        inputs
            .get(i)
            .copied()
            .ok_or_else(|| missing_field("gate input"))
    };

    let gate = match tag {
        t if t == TAG_AND => Gate::And {
            a: nth(0)?,
            b: nth(1)?,
            out: output,
        },
        t if t == TAG_OR => Gate::Or {
            a: nth(0)?,
            b: nth(1)?,
            out: output,
        },
        t if t == TAG_XOR => Gate::Xor {
            a: nth(0)?,
            b: nth(1)?,
            out: output,
        },
        t if t == TAG_NOT => Gate::Not {
            a: nth(0)?,
            out: output,
        },
        t if t == TAG_BUF => Gate::Buf {
            a: nth(0)?,
            out: output,
        },
        t if t == TAG_MUX => Gate::Mux {
            sel: nth(0)?,
            t: nth(1)?,
            f: nth(2)?,
            out: output,
        },
        t if t == TAG_CONST => {
            let value = obj
                .get("value")
                .and_then(Value::as_u64)
                .ok_or_else(|| missing_field("value"))?;
            Gate::Const {
                value: value != 0,
                out: output,
            }
        }
        other => {
            return Err(Error::UnsupportedPrimitive {
                what: format!("unknown gate type `{other}`"),
                locator: Locator::Unknown,
            })
        }
    };
    Ok(gate)
}

fn parse_dffs(value: Option<&Value>) -> Result<Vec<Dff>> {
    let arr = value
        .and_then(Value::as_array)
        .ok_or_else(|| missing_field("dffs"))?;
    arr.iter().map(parse_dff).collect()
}

fn parse_dff(value: &Value) -> Result<Dff> {
    let obj = value.as_object().ok_or_else(|| missing_field("dff"))?;
    let net = |key: &str| -> Result<NetId> {
        obj.get(key)
            .and_then(Value::as_u64)
            .map(|v| NetId::from(v as u32))
            .ok_or_else(|| missing_field("dff net"))
    };
    let opt_net = |key: &str| -> Result<Option<NetId>> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .map(|n| Some(NetId::from(n as u32)))
                .ok_or_else(|| missing_field("dff net")),
        }
    };
    Ok(Dff {
        d: net("d")?,
        q: net("q")?,
        rst: opt_net("rst")?,
        en: opt_net("en")?,
        async_reset: obj
            .get("async_reset")
            .and_then(Value::as_bool)
            .ok_or_else(|| missing_field("async_reset"))?,
        reset_value: obj
            .get("reset_value")
            .and_then(Value::as_u64)
            .ok_or_else(|| missing_field("reset_value"))?
            != 0,
    })
}
