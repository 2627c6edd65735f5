//! Shared error taxonomy used across every crate in the workspace.
//!
//! Every failure surfaced by lowering, scheduling, or evaluation is one of
//! these kinds, carrying a [`Locator`] back to the offending component,
//! gate, or net.

use std::fmt;

/// Where an error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A dotted component/connection path, e.g. `alu.result`.
    Component(String),
    /// An index into a [`crate::ir::Netlist`]'s `gates`.
    Gate(usize),
    /// A net index.
    Net(u32),
    /// No more specific location is known.
    Unknown,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Component(path) => write!(f, "component `{path}`"),
            Locator::Gate(idx) => write!(f, "gate #{idx}"),
            Locator::Net(idx) => write!(f, "net #{idx}"),
            Locator::Unknown => write!(f, "<unknown location>"),
        }
    }
}

/// The complete set of error kinds produced by this workspace (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid width {width} at {locator}: widths must be in 1..=64")]
    InvalidWidth { width: u32, locator: Locator },

    #[error("width mismatch at {locator}: expected {expected}, got {actual}")]
    WidthMismatch {
        expected: u32,
        actual: u32,
        locator: Locator,
    },

    #[error("multiple drivers for net at {locator}")]
    MultiDriver { locator: Locator },

    #[error("unknown port `{port}` at {locator}")]
    UnknownPort { port: String, locator: Locator },

    #[error("combinational loop detected involving {} gate(s), first at {locator}", residual.len())]
    CombinationalLoop {
        residual: Vec<usize>,
        locator: Locator,
    },

    #[error("unsupported primitive `{what}` at {locator}")]
    UnsupportedPrimitive { what: String, locator: Locator },

    #[error("scheduler made no progress with {remaining} gate(s) left unscheduled at {locator}")]
    ScheduleNotProgressing { remaining: usize, locator: Locator },

    #[error("async reset asserted with conflicting sync enable at {locator} (async reset wins)")]
    ResetViolation { locator: Locator },
}

impl Error {
    /// The locator this error was reported against.
    pub fn locator(&self) -> &Locator {
        match self {
            Error::InvalidWidth { locator, .. }
            | Error::WidthMismatch { locator, .. }
            | Error::MultiDriver { locator }
            | Error::UnknownPort { locator, .. }
            | Error::CombinationalLoop { locator, .. }
            | Error::UnsupportedPrimitive { locator, .. }
            | Error::ScheduleNotProgressing { locator, .. }
            | Error::ResetViolation { locator } => locator,
        }
    }

    /// Whether this error kind is recoverable (simulation may continue) or
    /// fatal (construction/lowering must abort). Per spec §7: only
    /// `ResetViolation` is a recovered warning, everything else is fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ResetViolation { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
