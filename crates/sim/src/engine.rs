//! Event-queue simulation engine.
//!
//! Signal changes are scheduled as `(time, seq)`-ordered events; `seq` is
//! a monotone insertion counter, so ties at the same tick pop in insertion
//! order and a replay of the same circuit is step-for-step identical.
//! Component re-evaluation propagates with a delay of one tick; external
//! stimuli (toggle, clock tick, set input) take effect at the current time.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use circuitforge_core::catalog;
use circuitforge_core::circuit::{CircuitState, Component, ComponentType, PinDirection};
use circuitforge_core::error::CoreError;
use circuitforge_core::protocol::{PinStates, WireStates};
use circuitforge_core::signal::Signal;

use crate::eval::{self, InternalState};

/// Step bound for [`SimulationEngine::run`]; generous for classroom-scale
/// circuits, small enough to stop a badly clocked one.
pub const MAX_SIM_STEPS: usize = 10_000;

/// A pin addressed by component and pin id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct PinRef {
    component_id: String,
    pin_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    time: u64,
    seq: u64,
    target: PinRef,
    value: Signal,
}

pub struct SimulationEngine {
    time: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Scheduled>>,
    components: HashMap<String, Component>,
    /// Component ids in placement order; drives deterministic init.
    order: Vec<String>,
    /// Wire id -> (driving pin, driven pin).
    wires: Vec<(String, PinRef, PinRef)>,
    /// Downstream input pins fed by each output pin.
    connections: HashMap<PinRef, Vec<PinRef>>,
    pin_values: HashMap<PinRef, Signal>,
    internal: HashMap<String, InternalState>,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self {
            time: 0,
            seq: 0,
            queue: BinaryHeap::new(),
            components: HashMap::new(),
            order: Vec::new(),
            wires: Vec::new(),
            connections: HashMap::new(),
            pin_values: HashMap::new(),
            internal: HashMap::new(),
        }
    }

    /// Load a circuit: reset the engine, seed source levels, and schedule
    /// the initial propagation wave. Call [`run`](Self::run) afterwards to
    /// settle.
    pub fn load(&mut self, circuit: &CircuitState) {
        *self = Self::new();

        for component in &circuit.components {
            self.order.push(component.id.clone());
            self.internal
                .insert(component.id.clone(), eval::initial_state(component.component_type));
            for pin in &component.pins {
                self.pin_values.insert(
                    PinRef {
                        component_id: component.id.clone(),
                        pin_id: pin.id.clone(),
                    },
                    Signal::Low,
                );
            }
            self.components
                .insert(component.id.clone(), component.clone());
        }

        for wire in &circuit.wires {
            let from = PinRef {
                component_id: wire.from_component_id.clone(),
                pin_id: wire.from_pin_id.clone(),
            };
            let to = PinRef {
                component_id: wire.to_component_id.clone(),
                pin_id: wire.to_pin_id.clone(),
            };
            self.connections
                .entry(from.clone())
                .or_default()
                .push(to.clone());
            self.wires.push((wire.id.clone(), from, to));
        }

        self.seed_sources();
        self.initial_wave();
    }

    /// Drive source outputs to their configured starting levels.
    fn seed_sources(&mut self) {
        use ComponentType::*;
        for id in self.order.clone() {
            let Some(component) = self.components.get(&id) else {
                continue;
            };
            match component.component_type {
                ConstHigh | Vcc5V | Vcc3V3 | Battery => {
                    self.set_pin(&id, "OUT", Signal::High);
                }
                ConstLow | Ground => {
                    self.set_pin(&id, "OUT", Signal::Low);
                }
                SwitchToggle | SwitchPush => {
                    let on = component.property_bool("state").unwrap_or(false);
                    self.set_pin(&id, "OUT", Signal::from_bool(on));
                }
                DipSwitch4 => {
                    let states: Vec<bool> = (0..4)
                        .map(|i| component.property_bool(&format!("state{i}")).unwrap_or(false))
                        .collect();
                    for (i, on) in states.into_iter().enumerate() {
                        self.set_pin(&id, &format!("OUT{i}"), Signal::from_bool(on));
                    }
                }
                Clock => {
                    self.set_pin(&id, "CLK", Signal::Low);
                }
                _ => {}
            }
        }
    }

    /// Evaluate every non-source component once against the seeded levels
    /// and queue the source levels for delivery, so gates whose resting
    /// output is not Low (NOT, NOR, ...) settle correctly.
    fn initial_wave(&mut self) {
        for id in self.order.clone() {
            let Some(component) = self.components.get(&id) else {
                continue;
            };
            if catalog::is_signal_source(component.component_type) {
                let outputs: Vec<(PinRef, Signal)> = component
                    .pins
                    .iter()
                    .filter(|p| p.direction == PinDirection::Output)
                    .map(|p| {
                        let pref = PinRef {
                            component_id: id.clone(),
                            pin_id: p.id.clone(),
                        };
                        let value = self.pin_values.get(&pref).copied().unwrap_or(Signal::Low);
                        (pref, value)
                    })
                    .collect();
                for (pref, value) in outputs {
                    self.schedule(0, &pref, value);
                }
            } else {
                self.reevaluate(&id);
            }
        }
    }

    /// Pop and apply one scheduled event. Returns `false` when the queue
    /// is empty. Events that no longer change anything are dropped without
    /// re-evaluation.
    pub fn step(&mut self) -> bool {
        let Some(Reverse(event)) = self.queue.pop() else {
            return false;
        };
        self.time = event.time;

        if self.pin_values.get(&event.target) == Some(&event.value) {
            return true;
        }
        self.pin_values.insert(event.target.clone(), event.value);
        self.reevaluate(&event.target.component_id);
        true
    }

    /// Run until the queue drains or `max` steps elapse. Returns the
    /// number of steps taken.
    pub fn run(&mut self, max: usize) -> usize {
        let mut steps = 0;
        while steps < max {
            if !self.step() {
                break;
            }
            steps += 1;
        }
        if steps == max {
            tracing::warn!(steps, "Simulation hit the step bound before settling");
        }
        steps
    }

    pub fn is_settled(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    /// Flip a switch. Zero-delay: downstream deliveries are scheduled at
    /// the current simulated time.
    pub fn toggle_switch(&mut self, component_id: &str) -> Result<Signal, CoreError> {
        let component = self
            .components
            .get(component_id)
            .ok_or_else(|| CoreError::not_found("component", component_id))?;
        if !matches!(
            component.component_type,
            ComponentType::SwitchToggle | ComponentType::SwitchPush
        ) {
            return Err(CoreError::validation(
                "INVALID_SIMULATION_TARGET",
                format!("Component {component_id} is not a switch"),
            ));
        }
        let pref = PinRef {
            component_id: component_id.to_string(),
            pin_id: "OUT".to_string(),
        };
        let current = self.pin_values.get(&pref).copied().unwrap_or(Signal::Low);
        let next = Signal::from_bool(current != Signal::High);
        self.drive(&pref, next);
        Ok(next)
    }

    /// Advance a clock by half a period (Low to High or back).
    pub fn tick_clock(&mut self, component_id: &str) -> Result<Signal, CoreError> {
        let component = self
            .components
            .get(component_id)
            .ok_or_else(|| CoreError::not_found("component", component_id))?;
        if component.component_type != ComponentType::Clock {
            return Err(CoreError::validation(
                "INVALID_SIMULATION_TARGET",
                format!("Component {component_id} is not a clock"),
            ));
        }
        let pref = PinRef {
            component_id: component_id.to_string(),
            pin_id: "CLK".to_string(),
        };
        let current = self.pin_values.get(&pref).copied().unwrap_or(Signal::Low);
        let next = Signal::from_bool(current != Signal::High);
        self.drive(&pref, next);
        Ok(next)
    }

    /// Force an output pin of a source component to a level.
    pub fn set_input(
        &mut self,
        component_id: &str,
        pin_id: &str,
        value: Signal,
    ) -> Result<(), CoreError> {
        let component = self
            .components
            .get(component_id)
            .ok_or_else(|| CoreError::not_found("component", component_id))?;
        if !catalog::is_signal_source(component.component_type) {
            return Err(CoreError::validation(
                "INVALID_SIMULATION_TARGET",
                format!("Component {component_id} is not a signal source"),
            ));
        }
        if component.pin(pin_id).is_none() {
            return Err(CoreError::not_found("pin", pin_id));
        }
        let pref = PinRef {
            component_id: component_id.to_string(),
            pin_id: pin_id.to_string(),
        };
        self.drive(&pref, value);
        Ok(())
    }

    /// Current level of every wire, keyed by wire id (the driving pin's
    /// value).
    pub fn wire_states(&self) -> WireStates {
        self.wires
            .iter()
            .map(|(id, from, _)| {
                let value = self.pin_values.get(from).copied().unwrap_or(Signal::Floating);
                (id.clone(), value)
            })
            .collect()
    }

    /// Current level of every pin, grouped by component id.
    pub fn pin_states(&self) -> PinStates {
        let mut states: PinStates = HashMap::new();
        for (pref, value) in &self.pin_values {
            states
                .entry(pref.component_id.clone())
                .or_default()
                .insert(pref.pin_id.clone(), *value);
        }
        states
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Set a pin level without scheduling (initialization only).
    fn set_pin(&mut self, component_id: &str, pin_id: &str, value: Signal) {
        self.pin_values.insert(
            PinRef {
                component_id: component_id.to_string(),
                pin_id: pin_id.to_string(),
            },
            value,
        );
    }

    /// Externally drive a pin: set it and deliver downstream at the
    /// current time.
    fn drive(&mut self, source: &PinRef, value: Signal) {
        self.pin_values.insert(source.clone(), value);
        let at = self.time;
        self.schedule(at, source, value);
    }

    /// Queue delivery of `value` to every input pin wired to `source`.
    fn schedule(&mut self, at: u64, source: &PinRef, value: Signal) {
        let Some(targets) = self.connections.get(source) else {
            return;
        };
        for target in targets.clone() {
            self.seq += 1;
            self.queue.push(Reverse(Scheduled {
                time: at,
                seq: self.seq,
                target,
                value,
            }));
        }
    }

    /// Recompute one component's outputs and schedule changed ones one
    /// tick later.
    fn reevaluate(&mut self, component_id: &str) {
        let outputs = {
            let Some(component) = self.components.get(component_id) else {
                return;
            };
            let inputs: HashMap<String, Signal> = component
                .pins
                .iter()
                .filter(|p| p.direction == PinDirection::Input)
                .map(|p| {
                    let pref = PinRef {
                        component_id: component_id.to_string(),
                        pin_id: p.id.clone(),
                    };
                    let value = self
                        .pin_values
                        .get(&pref)
                        .copied()
                        .unwrap_or(Signal::Floating);
                    (p.id.clone(), value)
                })
                .collect();
            let Some(state) = self.internal.get_mut(component_id) else {
                return;
            };
            eval::evaluate(component.component_type, &inputs, state)
        };

        for (pin_id, value) in outputs {
            let pref = PinRef {
                component_id: component_id.to_string(),
                pin_id: pin_id.to_string(),
            };
            if self.pin_values.get(&pref) != Some(&value) {
                self.pin_values.insert(pref.clone(), value);
                let at = self.time + 1;
                self.schedule(at, &pref, value);
            }
        }
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuitforge_core::catalog::instantiate;
    use circuitforge_core::circuit::Wire;

    fn wire(id: &str, from: &str, from_pin: &str, to: &str, to_pin: &str) -> Wire {
        Wire {
            id: id.to_string(),
            from_component_id: from.to_string(),
            from_pin_id: from_pin.to_string(),
            to_component_id: to.to_string(),
            to_pin_id: to_pin.to_string(),
            waypoints: Vec::new(),
        }
    }

    fn switch(id: &str, on: bool) -> circuitforge_core::circuit::Component {
        let mut c = instantiate(id, ComponentType::SwitchToggle, 0.0, 0.0);
        c.properties
            .insert("state".to_string(), serde_json::Value::Bool(on));
        c
    }

    /// Two switches into an AND gate into an LED.
    fn and_circuit(sw1_on: bool, sw2_on: bool) -> CircuitState {
        let mut circuit = CircuitState::empty("SIM001");
        circuit.components.push(switch("sw1", sw1_on));
        circuit.components.push(switch("sw2", sw2_on));
        circuit
            .components
            .push(instantiate("and1", ComponentType::And2, 100.0, 0.0));
        circuit
            .components
            .push(instantiate("led1", ComponentType::LedRed, 200.0, 0.0));
        circuit.wires.push(wire("w1", "sw1", "OUT", "and1", "A"));
        circuit.wires.push(wire("w2", "sw2", "OUT", "and1", "B"));
        circuit.wires.push(wire("w3", "and1", "OUT", "led1", "IN"));
        circuit
    }

    fn pin(engine: &SimulationEngine, component: &str, pin: &str) -> Signal {
        engine.pin_states()[component][pin]
    }

    #[test]
    fn and_gate_lights_the_led_only_when_both_switches_are_on() {
        let mut engine = SimulationEngine::new();
        engine.load(&and_circuit(true, true));
        engine.run(MAX_SIM_STEPS);
        assert!(engine.is_settled());
        assert_eq!(pin(&engine, "led1", "IN"), Signal::High);
        assert_eq!(engine.wire_states()["w3"], Signal::High);

        // Toggle one switch off: the LED goes dark.
        engine.toggle_switch("sw2").unwrap();
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "led1", "IN"), Signal::Low);

        // And back on.
        engine.toggle_switch("sw2").unwrap();
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "led1", "IN"), Signal::High);
    }

    #[test]
    fn inverter_settles_high_from_a_low_input() {
        let mut circuit = CircuitState::empty("SIM002");
        circuit.components.push(switch("sw1", false));
        circuit
            .components
            .push(instantiate("not1", ComponentType::Not, 100.0, 0.0));
        circuit
            .components
            .push(instantiate("led1", ComponentType::LedRed, 200.0, 0.0));
        circuit.wires.push(wire("w1", "sw1", "OUT", "not1", "A"));
        circuit.wires.push(wire("w2", "not1", "OUT", "led1", "IN"));

        let mut engine = SimulationEngine::new();
        engine.load(&circuit);
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "led1", "IN"), Signal::High);
    }

    #[test]
    fn identical_runs_produce_identical_states() {
        let circuit = and_circuit(true, false);

        let mut first = SimulationEngine::new();
        first.load(&circuit);
        let steps_a = first.run(MAX_SIM_STEPS);

        let mut second = SimulationEngine::new();
        second.load(&circuit);
        let steps_b = second.run(MAX_SIM_STEPS);

        assert_eq!(steps_a, steps_b);
        assert_eq!(first.pin_states(), second.pin_states());
        assert_eq!(first.wire_states(), second.wire_states());
    }

    #[test]
    fn clock_ticks_drive_a_flip_flop() {
        let mut circuit = CircuitState::empty("SIM003");
        circuit.components.push(switch("d", true));
        circuit
            .components
            .push(instantiate("clk1", ComponentType::Clock, 0.0, 50.0));
        circuit
            .components
            .push(instantiate("ff1", ComponentType::DFlipFlop, 100.0, 0.0));
        circuit.wires.push(wire("w1", "d", "OUT", "ff1", "D"));
        circuit.wires.push(wire("w2", "clk1", "CLK", "ff1", "CLK"));

        let mut engine = SimulationEngine::new();
        engine.load(&circuit);
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "ff1", "Q"), Signal::Low);

        // Rising edge latches D.
        assert_eq!(engine.tick_clock("clk1").unwrap(), Signal::High);
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "ff1", "Q"), Signal::High);

        // Falling edge: Q holds.
        assert_eq!(engine.tick_clock("clk1").unwrap(), Signal::Low);
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "ff1", "Q"), Signal::High);
    }

    #[test]
    fn counter_advances_once_per_full_clock_cycle() {
        let mut circuit = CircuitState::empty("SIM004");
        circuit
            .components
            .push(instantiate("clk1", ComponentType::Clock, 0.0, 0.0));
        circuit
            .components
            .push(instantiate("ctr1", ComponentType::Counter4Bit, 100.0, 0.0));
        circuit.wires.push(wire("w1", "clk1", "CLK", "ctr1", "CLK"));
        // RST is floating on purpose; the completeness check would flag
        // it, but the engine itself treats it as not asserted.

        let mut engine = SimulationEngine::new();
        engine.load(&circuit);
        engine.run(MAX_SIM_STEPS);

        for _ in 0..3 {
            engine.tick_clock("clk1").unwrap(); // rising
            engine.run(MAX_SIM_STEPS);
            engine.tick_clock("clk1").unwrap(); // falling
            engine.run(MAX_SIM_STEPS);
        }
        assert_eq!(pin(&engine, "ctr1", "Q0"), Signal::High);
        assert_eq!(pin(&engine, "ctr1", "Q1"), Signal::High);
        assert_eq!(pin(&engine, "ctr1", "Q2"), Signal::Low);
    }

    #[test]
    fn junction_fans_a_signal_out() {
        let mut circuit = CircuitState::empty("SIM005");
        circuit.components.push(switch("sw1", true));
        circuit
            .components
            .push(instantiate("j1", ComponentType::Junction, 50.0, 0.0));
        circuit
            .components
            .push(instantiate("led1", ComponentType::LedRed, 100.0, 0.0));
        circuit
            .components
            .push(instantiate("led2", ComponentType::LedGreen, 100.0, 50.0));
        circuit.wires.push(wire("w1", "sw1", "OUT", "j1", "IN"));
        circuit.wires.push(wire("w2", "j1", "OUT1", "led1", "IN"));
        circuit.wires.push(wire("w3", "j1", "OUT2", "led2", "IN"));

        let mut engine = SimulationEngine::new();
        engine.load(&circuit);
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "led1", "IN"), Signal::High);
        assert_eq!(pin(&engine, "led2", "IN"), Signal::High);
    }

    #[test]
    fn toggle_rejects_non_switches() {
        let mut circuit = CircuitState::empty("SIM006");
        circuit
            .components
            .push(instantiate("and1", ComponentType::And2, 0.0, 0.0));
        let mut engine = SimulationEngine::new();
        engine.load(&circuit);

        assert!(engine.toggle_switch("and1").is_err());
        assert!(engine.toggle_switch("ghost").is_err());
    }

    #[test]
    fn set_input_forces_a_source_level() {
        let mut engine = SimulationEngine::new();
        engine.load(&and_circuit(false, true));
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "led1", "IN"), Signal::Low);

        // Force sw1 high without a toggle; the AND output follows.
        engine.set_input("sw1", "OUT", Signal::High).unwrap();
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "led1", "IN"), Signal::High);

        engine.set_input("sw1", "OUT", Signal::Low).unwrap();
        engine.run(MAX_SIM_STEPS);
        assert_eq!(pin(&engine, "led1", "IN"), Signal::Low);
    }

    #[test]
    fn set_input_rejects_non_sources_and_unknown_pins() {
        let mut engine = SimulationEngine::new();
        engine.load(&and_circuit(false, false));

        assert!(engine.set_input("and1", "OUT", Signal::High).is_err());
        assert!(engine.set_input("sw1", "NOPE", Signal::High).is_err());
        assert!(engine.set_input("ghost", "OUT", Signal::High).is_err());
    }
}
