//! Discrete-event digital-logic simulator.
//!
//! One [`SimulationEngine`] instance per running session. Circuits must
//! pass [`check_circuit`] before an engine is started; a checked circuit
//! always settles (or hits the step bound on pathological clocking).

pub mod check;
pub mod engine;
mod eval;

pub use check::check_circuit;
pub use engine::{SimulationEngine, MAX_SIM_STEPS};
