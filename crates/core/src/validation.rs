//! Wire connection rules.
//!
//! Checked at mutation time against the freshly reconstructed state, never
//! at fold time: a log that passed validation when written always replays.

use crate::circuit::{CircuitState, Pin, PinDirection, Wire};
use crate::error::CoreError;

/// Validate a wire against the current state.
///
/// Rules are checked in a fixed order so the reported code is stable:
/// duplicate wire, input already connected, endpoints exist, directions.
pub fn validate_wire(state: &CircuitState, wire: &Wire) -> Result<(), CoreError> {
    if state.wires.iter().any(|w| {
        w.from_component_id == wire.from_component_id
            && w.from_pin_id == wire.from_pin_id
            && w.to_component_id == wire.to_component_id
            && w.to_pin_id == wire.to_pin_id
    }) {
        return Err(CoreError::validation(
            "DUPLICATE_WIRE",
            "A wire already connects these pins",
        ));
    }

    // Fan-in is 1: each input pin accepts at most one wire.
    if state
        .wires
        .iter()
        .any(|w| w.to_component_id == wire.to_component_id && w.to_pin_id == wire.to_pin_id)
    {
        return Err(CoreError::validation(
            "INPUT_ALREADY_CONNECTED",
            format!(
                "Input pin {} on component {} already has a connection",
                wire.to_pin_id, wire.to_component_id
            ),
        ));
    }

    let from_pin = endpoint(state, &wire.from_component_id, &wire.from_pin_id, "source")?;
    let to_pin = endpoint(state, &wire.to_component_id, &wire.to_pin_id, "target")?;

    if from_pin.direction != PinDirection::Output || to_pin.direction != PinDirection::Input {
        return Err(CoreError::validation(
            "INVALID_WIRE_DIRECTION",
            "Wires must run from an output pin to an input pin",
        ));
    }

    Ok(())
}

fn endpoint<'a>(
    state: &'a CircuitState,
    component_id: &str,
    pin_id: &str,
    side: &str,
) -> Result<&'a Pin, CoreError> {
    let component = state.component(component_id).ok_or_else(|| {
        CoreError::validation(
            "INVALID_WIRE",
            format!("Wire {side} component {component_id} does not exist"),
        )
    })?;
    component.pin(pin_id).ok_or_else(|| {
        CoreError::validation(
            "INVALID_WIRE",
            format!("Wire {side} pin {pin_id} does not exist on component {component_id}"),
        )
    })
}
