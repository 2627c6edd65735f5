//! The behavioral simulator: fixed-point combinational settling plus
//! two-phase sequential sample/commit (spec §4.B, §5).

use std::collections::HashMap;

use hdlcore::{Error, Locator, Result};
use hdlcore_signal::{Clock, SignalBus, WireId};
use tracing::warn;

use crate::component::{Behavior, Component};
use crate::expr::{Env, Typed};

/// Default bound on combinational fixed-point iterations before a
/// [`Error::CombinationalLoop`] is raised (spec §4.B).
pub const MAX_ITERATIONS: usize = 1000;

/// Index of a [`Component`] within a [`BehavioralSimulator`].
pub type ComponentId = usize;
/// Index of a [`Clock`] within a [`BehavioralSimulator`].
pub type ClockId = usize;

/// Owns a [`SignalBus`], a flat arena of [`Component`]s, and the clocks
/// driving their sequential behavior. This is the reference oracle spec §2
/// calls component G's other half: behavioral simulation against which
/// structural (lowered + scheduled + evaluated) simulation is checked.
pub struct BehavioralSimulator {
    pub bus: SignalBus,
    components: Vec<Component>,
    clocks: Vec<Clock>,
    max_iterations: usize,
}

impl Default for BehavioralSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BehavioralSimulator {
    pub fn new() -> Self {
        Self {
            bus: SignalBus::new(),
            components: Vec::new(),
            clocks: Vec::new(),
            max_iterations: MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn add_component(&mut self, component: Component) -> ComponentId {
        self.components.push(component);
        self.components.len() - 1
    }

    pub fn add_clock(&mut self, wire: WireId, period: u32) -> ClockId {
        self.clocks.push(Clock::new(&self.bus, wire, period));
        self.clocks.len() - 1
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id]
    }

    pub fn clock(&self, id: ClockId) -> &Clock {
        &self.clocks[id]
    }

    /// Builds the evaluation environment for `component` from the current
    /// bus state: every input, output, and internal port bound to its live
    /// value and width.
    fn env_for(&self, component: &Component) -> Env {
        let mut env = Env::new();
        for port in component
            .inputs
            .iter()
            .chain(component.outputs.iter())
            .chain(component.internals.iter())
        {
            if let Some(wire) = component.wire(&port.name) {
                env.insert(
                    port.name.clone(),
                    Typed::new(self.bus.get(wire), self.bus.width(wire)),
                );
            }
        }
        env
    }

    fn target_width(component: &Component, target: &str) -> Option<u32> {
        component
            .outputs
            .iter()
            .chain(component.internals.iter())
            .find(|p| p.name == target)
            .map(|p| p.width)
    }

    /// Re-evaluates one combinational component against the current bus
    /// state and writes its outputs. Returns whether any output observably
    /// changed.
    fn eval_combinational(&mut self, id: ComponentId) -> Result<bool> {
        let (assigns, env) = {
            let component = &self.components[id];
            let Behavior::Combinational { assigns } = &component.behavior else {
                unreachable!("eval_combinational called on a non-combinational component");
            };
            (assigns.clone(), self.env_for(component))
        };

        let mut changed = false;
        for assignment in &assigns {
            let value = assignment.expr.eval(&env)?;
            let component = &self.components[id];
            let width = Self::target_width(component, &assignment.target).ok_or_else(|| {
                Error::UnknownPort {
                    port: assignment.target.clone(),
                    locator: Locator::Component(component.path.clone()),
                }
            })?;
            let truncated = Typed::new(value.value, width).value;
            let wire = component.wire(&assignment.target).ok_or_else(|| {
                Error::UnknownPort {
                    port: assignment.target.clone(),
                    locator: Locator::Component(component.path.clone()),
                }
            })?;
            if self.bus.get(wire) != truncated {
                changed = true;
            }
            self.bus.set(wire, truncated);
        }
        Ok(changed)
    }

    /// Runs the global combinational fixed-point iteration until no output
    /// changes or `max_iterations` is exceeded (spec §4.B).
    fn settle_combinational(&mut self) -> Result<()> {
        for _ in 0..self.max_iterations {
            let mut changed = false;
            for id in 0..self.components.len() {
                if self.components[id].is_sequential() {
                    continue;
                }
                changed |= self.eval_combinational(id)?;
            }
            if !changed {
                return Ok(());
            }
        }
        let residual: Vec<usize> = (0..self.components.len())
            .filter(|&id| !self.components[id].is_sequential())
            .collect();
        Err(Error::CombinationalLoop {
            locator: Locator::Unknown,
            residual,
        })
    }

    /// Computes and stashes pending values for one sequential component
    /// without writing them — the sample half of spec §4.B's two phases.
    fn sample(&mut self, id: ComponentId, clock_edge: bool) -> Result<()> {
        let (assigns, reset, env) = {
            let component = &self.components[id];
            let Behavior::Sequential {
                assigns, reset, ..
            } = &component.behavior
            else {
                unreachable!("sample called on a non-sequential component");
            };
            (assigns.clone(), reset.clone(), self.env_for(component))
        };

        let reset_asserted = reset
            .as_ref()
            .map(|r| self.bus.get(r.signal) != 0)
            .unwrap_or(false);
        let is_async = reset.as_ref().map(|r| r.asynchronous).unwrap_or(false);

        let should_sample = clock_edge || (is_async && reset_asserted);
        if !should_sample {
            return Ok(());
        }

        // `should_sample` already guarantees a synchronous reset is only
        // handled here on its active edge, and an asynchronous reset on
        // any propagation while asserted.
        let mut pending = HashMap::new();
        if reset_asserted {
            let reset = reset.as_ref().expect("reset_asserted implies reset is Some");
            for (target, value) in &reset.reset_values {
                pending.insert(target.clone(), *value);
            }
        } else if clock_edge {
            for assignment in &assigns {
                let value = assignment.expr.eval(&env)?;
                let component = &self.components[id];
                let width = Self::target_width(component, &assignment.target).ok_or_else(
                    || Error::UnknownPort {
                        port: assignment.target.clone(),
                        locator: Locator::Component(component.path.clone()),
                    },
                )?;
                pending.insert(assignment.target.clone(), Typed::new(value.value, width).value);
            }
        }

        if !pending.is_empty() {
            self.components[id].pending = Some(pending);
        }
        Ok(())
    }

    /// Writes every component's stashed pending values to the bus. All
    /// sequential components commit from their pre-tick snapshots, so none
    /// observes another's newly-committed state this cycle (spec §4.F,
    /// testable property 4).
    fn commit(&mut self) {
        for id in 0..self.components.len() {
            let Some(pending) = self.components[id].pending.take() else {
                continue;
            };
            for (target, value) in pending {
                if let Some(wire) = self.components[id].wire(&target) {
                    self.bus.set(wire, value);
                }
            }
        }
    }

    /// Runs one full propagation: syncs every clock's edge state, samples
    /// and commits sequential components whose clock rose (or whose async
    /// reset is asserted), then settles the combinational fixed point.
    pub fn propagate(&mut self) -> Result<()> {
        let mut edges = vec![false; self.clocks.len()];
        for (i, clock) in self.clocks.iter_mut().enumerate() {
            let (rising, _falling) = clock.sync(&self.bus);
            edges[i] = rising;
        }

        for id in 0..self.components.len() {
            let clock_edge = match &self.components[id].behavior {
                Behavior::Sequential { clock, .. } => self
                    .clocks
                    .iter()
                    .position(|c| c.wire() == *clock)
                    .map(|idx| edges[idx])
                    .unwrap_or(false),
                Behavior::Combinational { .. } => continue,
            };
            if let Err(e) = self.sample(id, clock_edge) {
                if e.is_recoverable() {
                    warn!(component = %self.components[id].path, error = %e, "recovered sequential error");
                } else {
                    return Err(e);
                }
            }
        }
        self.commit();
        self.settle_combinational()
    }

    /// Drives `clock_id`'s wire through one full period (rising then
    /// falling) and propagates after each half, running `cycles` complete
    /// periods.
    pub fn run(&mut self, cycles: usize) -> Result<()> {
        self.settle_combinational()?;
        for _ in 0..cycles {
            let wire = self.clocks[0].wire();
            self.bus.set(wire, 1);
            self.propagate()?;
            self.bus.set(wire, 0);
            self.propagate()?;
        }
        Ok(())
    }
}
