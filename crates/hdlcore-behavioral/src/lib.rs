//! Two-phase behavioral component runtime and expression AST (spec §4.B).
//!
//! This is the reference oracle the rest of the workspace is checked
//! against: a [`BehavioralSimulator`] drives a tree of [`Component`]s
//! directly, without ever lowering them to a [`hdlcore::Netlist`].

pub mod component;
pub mod expr;
mod sim;

pub use component::{Assignment, Behavior, Component, Port, ResetConfig};
pub use expr::{BinOp, Env, Expr, Typed, UnOp};
pub use sim::{BehavioralSimulator, ClockId, ComponentId, MAX_ITERATIONS};
