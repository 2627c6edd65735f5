//! Behavioral components: named nodes with input/output/internal port maps
//! and either combinational or sequential behavior (spec §3 "Component
//! (behavioral)", §4.B).

use std::collections::HashMap;

use hdlcore_signal::WireId;

use crate::expr::Expr;

/// One port on a [`Component`]: a name and a declared width.
#[derive(Clone, Debug)]
pub struct Port {
    pub name: String,
    pub width: u32,
}

impl Port {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// One `target ← expression` assignment (spec §4.B "public contract for
/// constructing behavior").
#[derive(Clone, Debug)]
pub struct Assignment {
    pub target: String,
    pub expr: Expr,
}

impl Assignment {
    pub fn new(target: impl Into<String>, expr: Expr) -> Self {
        Self {
            target: target.into(),
            expr,
        }
    }
}

/// Per-component reset wiring: which signal, whether it is synchronous or
/// asynchronous, and the value each clocked output takes when asserted.
#[derive(Clone, Debug)]
pub struct ResetConfig {
    pub signal: WireId,
    pub asynchronous: bool,
    pub reset_values: Vec<(String, u64)>,
}

/// A component's behavior descriptor.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// A pure function of current inputs/internals producing outputs,
    /// re-evaluated every fixed-point iteration.
    Combinational { assigns: Vec<Assignment> },
    /// A clock-gated update using sample/commit semantics. `clock` names
    /// the clock wire this component is sensitive to.
    Sequential {
        clock: WireId,
        reset: Option<ResetConfig>,
        assigns: Vec<Assignment>,
    },
}

/// A named behavioral node: ports, behavior, and the wire each declared
/// name is bound to in the owning [`crate::BehavioralSimulator`]'s bus.
#[derive(Clone, Debug)]
pub struct Component {
    pub path: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub internals: Vec<Port>,
    pub behavior: Behavior,
    pub(crate) wires: HashMap<String, WireId>,
    /// Pending values computed in the sample phase, written atomically in
    /// the commit phase (spec §4.B "strict two-phase semantics").
    pub(crate) pending: Option<HashMap<String, u64>>,
}

impl Component {
    pub fn new(
        path: impl Into<String>,
        inputs: Vec<Port>,
        outputs: Vec<Port>,
        internals: Vec<Port>,
        behavior: Behavior,
        wires: HashMap<String, WireId>,
    ) -> Self {
        Self {
            path: path.into(),
            inputs,
            outputs,
            internals,
            behavior,
            wires,
            pending: None,
        }
    }

    pub fn wire(&self, name: &str) -> Option<WireId> {
        self.wires.get(name).copied()
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self.behavior, Behavior::Sequential { .. })
    }
}
