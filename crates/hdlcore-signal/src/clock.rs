//! A named 1-bit wire with stateful rising/falling edge detection (spec
//! §3 "Clock").

use crate::bus::{SignalBus, WireId};

/// A clock wire plus the bookkeeping needed to answer `rising?`/`falling?`
/// during the same propagation that advanced it. Edge state is derived by
/// comparing the wire's current value against the value observed at the
/// last [`Clock::sync`] call, so it stays correct whether the wire was
/// changed by [`Clock::drive`] or by a direct `poke`.
#[derive(Debug)]
pub struct Clock {
    wire: WireId,
    period: u32,
    cycles: u64,
    prior: bool,
}

impl Clock {
    /// Wraps an already-allocated 1-bit wire as a clock. The wire's current
    /// value is taken as the initial "prior" state.
    pub fn new(bus: &SignalBus, wire: WireId, period: u32) -> Self {
        Self {
            wire,
            period,
            cycles: 0,
            prior: bus.bit(wire, 0),
        }
    }

    pub fn wire(&self) -> WireId {
        self.wire
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Number of rising edges observed so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Directly drives the clock wire to `value`.
    pub fn drive(&self, bus: &mut SignalBus, value: bool) {
        bus.set(self.wire, value as u64);
    }

    /// Compares the wire's current value against the last-observed value
    /// and returns `(rising, falling)`, then updates the observed value.
    /// Increments the cycle counter on a rising edge.
    pub fn sync(&mut self, bus: &SignalBus) -> (bool, bool) {
        let current = bus.bit(self.wire, 0);
        let rising = !self.prior && current;
        let falling = self.prior && !current;
        if rising {
            self.cycles += 1;
        }
        self.prior = current;
        (rising, falling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_detects_rising_and_falling() {
        let mut bus = SignalBus::new();
        let w = bus.alloc("clk", 1).unwrap();
        let mut clk = Clock::new(&bus, w, 1);

        clk.drive(&mut bus, true);
        let (rising, falling) = clk.sync(&bus);
        assert!(rising);
        assert!(!falling);
        assert_eq!(clk.cycle_count(), 1);

        clk.drive(&mut bus, false);
        let (rising, falling) = clk.sync(&bus);
        assert!(!rising);
        assert!(falling);
        assert_eq!(clk.cycle_count(), 1);
    }
}
