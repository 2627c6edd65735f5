//! Netlist IR, deterministic serialization, and the shared error taxonomy
//! for the hdlcore gate-level simulation framework.
//!
//! This crate defines the data model every other crate in the workspace
//! builds on: [`ir::Netlist`] is produced by `hdlcore-lower`, annotated with
//! a schedule by `hdlcore-sched`, and consumed by `hdlcore-eval` and
//! `hdlcore-conformance`. [`error::Error`] is the single error type shared
//! across all of them.

pub mod error;
pub mod ir;

pub use error::{Error, Locator, Result};
pub use ir::{CircuitStats, Dff, Gate, NetId, Netlist};
