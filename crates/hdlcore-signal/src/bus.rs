//! The wire arena (spec §4.A).

use std::collections::VecDeque;
use std::fmt;

use hdlcore::{Error, Locator, Result};

use crate::mask;

/// A dense index into a [`SignalBus`]'s wire arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WireId(u32);

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Wire {
    path: String,
    width: u32,
    value: u64,
    sinks: Vec<WireId>,
}

/// Owns every [`crate::bus`]-internal `Wire` in a design and runs change
/// propagation between them. Subscriber callbacks are kept in a side table
/// so a `Wire` itself stays plain data (spec §9 "cyclic component graphs").
pub struct SignalBus {
    wires: Vec<Wire>,
    subscribers: Vec<Vec<Box<dyn FnMut(u64)>>>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        Self {
            wires: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Allocates a new wire named `path` with the given `width`, initial
    /// value 0. Fails with [`Error::InvalidWidth`] if `width` is 0 or
    /// exceeds [`crate::MAX_WIDTH`].
    pub fn alloc(&mut self, path: impl Into<String>, width: u32) -> Result<WireId> {
        let path = path.into();
        if width == 0 || width > crate::MAX_WIDTH {
            return Err(Error::InvalidWidth {
                width,
                locator: Locator::Component(path),
            });
        }
        let id = WireId(self.wires.len() as u32);
        self.wires.push(Wire {
            path,
            width,
            value: 0,
            sinks: Vec::new(),
        });
        self.subscribers.push(Vec::new());
        Ok(id)
    }

    fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.0 as usize]
    }

    pub fn width(&self, id: WireId) -> u32 {
        self.wire(id).width
    }

    pub fn path(&self, id: WireId) -> &str {
        &self.wire(id).path
    }

    /// Reads the wire's current value. Uninitialized wires read as 0 (spec
    /// §4.A "deterministic default").
    pub fn get(&self, id: WireId) -> u64 {
        self.wire(id).value
    }

    /// Reads a single bit of the wire's value.
    pub fn bit(&self, id: WireId, i: u32) -> bool {
        (self.get(id) >> i) & 1 != 0
    }

    /// Writes `value` to `id`, truncating to its width. Subscriber
    /// callbacks and connected sinks only fire if the truncated value
    /// actually changed, and propagation is breadth-first rather than
    /// recursive so long sink chains never grow the call stack.
    pub fn set(&mut self, id: WireId, value: u64) {
        let mut queue = VecDeque::new();
        queue.push_back((id, value));
        while let Some((id, value)) = queue.pop_front() {
            let width = self.wire(id).width;
            let truncated = mask(value, width);
            if self.wire(id).value == truncated {
                continue;
            }
            self.wires[id.0 as usize].value = truncated;
            for cb in &mut self.subscribers[id.0 as usize] {
                cb(truncated);
            }
            let sinks = self.wire(id).sinks.clone();
            for sink in sinks {
                queue.push_back((sink, truncated));
            }
        }
    }

    /// Registers a callback invoked with the new value whenever `id`
    /// observably changes.
    pub fn on_change(&mut self, id: WireId, cb: impl FnMut(u64) + 'static) {
        self.subscribers[id.0 as usize].push(Box::new(cb));
    }

    /// Records `sink` as a downstream consumer of `source`'s value; does
    /// not itself copy the current value (use [`SignalBus::connect`] for
    /// that).
    pub fn add_sink(&mut self, source: WireId, sink: WireId) {
        self.wires[source.0 as usize].sinks.push(sink);
    }

    /// Installs a standing connection from `source` to `dest`: `dest`
    /// immediately takes `source`'s current value and every subsequent
    /// change to `source` is copied to `dest`. Widths must match.
    pub fn connect(&mut self, source: WireId, dest: WireId) -> Result<()> {
        let (sw, dw) = (self.width(source), self.width(dest));
        if sw != dw {
            return Err(Error::WidthMismatch {
                expected: sw,
                actual: dw,
                locator: Locator::Component(format!(
                    "{} -> {}",
                    self.path(source),
                    self.path(dest)
                )),
            });
        }
        self.add_sink(source, dest);
        let current = self.get(source);
        self.set(dest, current);
        Ok(())
    }
}
