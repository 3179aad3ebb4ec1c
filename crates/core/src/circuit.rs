//! Circuit domain model and the pure event fold.
//!
//! `CircuitState` is never mutated in place by callers: the only way state
//! changes is by folding `CircuitEvent`s over it, so two replays of the
//! same log always produce the same state.

use serde::{Deserialize, Serialize};

use crate::event::{CircuitEvent, EventPayload};
use crate::types::Timestamp;

/// Schema tag written into exported circuit documents; bumped on breaking
/// changes to the serialized shape.
pub const SCHEMA_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Canvas coordinates in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Component rotation, limited to quarter turns. Serialized as the angle
/// in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        match value {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(format!("invalid rotation: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Components and pins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

/// Connection point on a component. `position` is relative to the
/// component origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub name: String,
    pub direction: PinDirection,
    pub position: Position,
}

/// The closed set of placeable component types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    // Logic gates
    #[serde(rename = "AND_2")]
    And2,
    #[serde(rename = "AND_3")]
    And3,
    #[serde(rename = "AND_4")]
    And4,
    #[serde(rename = "OR_2")]
    Or2,
    #[serde(rename = "OR_3")]
    Or3,
    #[serde(rename = "OR_4")]
    Or4,
    #[serde(rename = "NOT")]
    Not,
    #[serde(rename = "BUFFER")]
    Buffer,
    #[serde(rename = "NAND_2")]
    Nand2,
    #[serde(rename = "NAND_3")]
    Nand3,
    #[serde(rename = "NOR_2")]
    Nor2,
    #[serde(rename = "NOR_3")]
    Nor3,
    #[serde(rename = "XOR_2")]
    Xor2,
    #[serde(rename = "XNOR_2")]
    Xnor2,
    // Flip-flops and latches
    #[serde(rename = "SR_LATCH")]
    SrLatch,
    #[serde(rename = "D_FLIPFLOP")]
    DFlipFlop,
    #[serde(rename = "JK_FLIPFLOP")]
    JkFlipFlop,
    #[serde(rename = "T_FLIPFLOP")]
    TFlipFlop,
    // Combinational blocks
    #[serde(rename = "MUX_2TO1")]
    Mux2To1,
    #[serde(rename = "MUX_4TO1")]
    Mux4To1,
    #[serde(rename = "DECODER_2TO4")]
    Decoder2To4,
    #[serde(rename = "ADDER_4BIT")]
    Adder4Bit,
    // Sequential blocks
    #[serde(rename = "COUNTER_4BIT")]
    Counter4Bit,
    #[serde(rename = "SHIFT_REGISTER_8BIT")]
    ShiftRegister8Bit,
    // Input devices
    #[serde(rename = "SWITCH_TOGGLE")]
    SwitchToggle,
    #[serde(rename = "SWITCH_PUSH")]
    SwitchPush,
    #[serde(rename = "DIP_SWITCH_4")]
    DipSwitch4,
    #[serde(rename = "CLOCK")]
    Clock,
    #[serde(rename = "CONST_HIGH")]
    ConstHigh,
    #[serde(rename = "CONST_LOW")]
    ConstLow,
    // Output devices
    #[serde(rename = "LED_RED")]
    LedRed,
    #[serde(rename = "LED_GREEN")]
    LedGreen,
    #[serde(rename = "LED_YELLOW")]
    LedYellow,
    #[serde(rename = "LED_BLUE")]
    LedBlue,
    #[serde(rename = "DISPLAY_7SEG")]
    Display7Seg,
    #[serde(rename = "BUZZER")]
    Buzzer,
    // Passive parts
    #[serde(rename = "RESISTOR")]
    Resistor,
    #[serde(rename = "CAPACITOR")]
    Capacitor,
    #[serde(rename = "DIODE")]
    Diode,
    // Power
    #[serde(rename = "VCC_5V")]
    Vcc5V,
    #[serde(rename = "VCC_3V3")]
    Vcc3V3,
    #[serde(rename = "GROUND")]
    Ground,
    #[serde(rename = "BATTERY")]
    Battery,
    // Connectors
    #[serde(rename = "JUNCTION")]
    Junction,
    #[serde(rename = "PROBE")]
    Probe,
}

/// A placed component instance.
///
/// `properties` is a client-defined bag (label, switch state, clock
/// frequency); the server only reads the keys the simulator cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub position: Position,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub pins: Vec<Pin>,
}

impl Component {
    pub fn pin(&self, pin_id: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == pin_id)
    }

    /// Boolean property lookup, `None` when absent or not a bool.
    pub fn property_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(|v| v.as_bool())
    }
}

// ---------------------------------------------------------------------------
// Wires and annotations
// ---------------------------------------------------------------------------

/// A directed connection from an output pin to an input pin.
///
/// Fan-out is unrestricted (one output may feed many wires); fan-in is
/// one (each input pin accepts at most one wire), enforced at mutation
/// time by [`crate::validation::validate_wire`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wire {
    pub id: String,
    pub from_component_id: String,
    pub from_pin_id: String,
    pub to_component_id: String,
    pub to_pin_id: String,
    /// Display-only routing points, stored and relayed untouched.
    #[serde(default)]
    pub waypoints: Vec<Position>,
}

/// Freehand stroke width in logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StrokeWidth {
    Thin,
    #[default]
    Medium,
    Thick,
}

impl From<StrokeWidth> for u8 {
    fn from(value: StrokeWidth) -> Self {
        match value {
            StrokeWidth::Thin => 2,
            StrokeWidth::Medium => 4,
            StrokeWidth::Thick => 8,
        }
    }
}

impl TryFrom<u8> for StrokeWidth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(StrokeWidth::Thin),
            4 => Ok(StrokeWidth::Medium),
            8 => Ok(StrokeWidth::Thick),
            other => Err(format!("invalid stroke width: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeData {
    pub points: Vec<Position>,
    pub color: String,
    pub width: StrokeWidth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub position: Position,
    pub text: String,
    pub color: String,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum AnnotationKind {
    Stroke(StrokeData),
    Text(TextData),
}

/// A drawing-layer element; owned by the participant that created it but
/// deletable by anyone with edit permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

// ---------------------------------------------------------------------------
// Circuit state and the event fold
// ---------------------------------------------------------------------------

/// The complete shared diagram at one log version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitState {
    pub session_code: String,
    /// Version of the last folded event; 0 for an empty circuit.
    pub version: u64,
    pub schema_version: String,
    pub components: Vec<Component>,
    pub wires: Vec<Wire>,
    pub annotations: Vec<Annotation>,
    pub updated_at: Timestamp,
}

impl CircuitState {
    /// Version-0 state. `updated_at` starts at the epoch so that replaying
    /// the same log always yields the same bytes.
    pub fn empty(session_code: impl Into<String>) -> Self {
        Self {
            session_code: session_code.into(),
            version: 0,
            schema_version: SCHEMA_VERSION.to_string(),
            components: Vec::new(),
            wires: Vec::new(),
            annotations: Vec::new(),
            updated_at: chrono::DateTime::UNIX_EPOCH,
        }
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn wire(&self, id: &str) -> Option<&Wire> {
        self.wires.iter().find(|w| w.id == id)
    }

    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Wires with either endpoint on the given component.
    pub fn wires_touching(&self, component_id: &str) -> Vec<&Wire> {
        self.wires
            .iter()
            .filter(|w| w.from_component_id == component_id || w.to_component_id == component_id)
            .collect()
    }

    /// Fold one event into the state.
    ///
    /// Never fails: references to ids that no longer exist are no-ops, so
    /// a log produced by any valid sequence of mutations always replays.
    pub fn apply(&mut self, event: &CircuitEvent) {
        match &event.payload {
            EventPayload::ComponentAdded { component } => {
                match self.components.iter_mut().find(|c| c.id == component.id) {
                    Some(existing) => *existing = component.clone(),
                    None => self.components.push(component.clone()),
                }
            }
            EventPayload::ComponentMoved {
                component_id,
                position,
            } => {
                if let Some(c) = self.components.iter_mut().find(|c| &c.id == component_id) {
                    c.position = *position;
                }
            }
            EventPayload::ComponentDeleted { component_id } => {
                self.components.retain(|c| &c.id != component_id);
            }
            EventPayload::WireAdded { wire } => {
                match self.wires.iter_mut().find(|w| w.id == wire.id) {
                    Some(existing) => *existing = wire.clone(),
                    None => self.wires.push(wire.clone()),
                }
            }
            EventPayload::WireDeleted { wire_id } => {
                self.wires.retain(|w| &w.id != wire_id);
            }
            EventPayload::AnnotationAdded { annotation } => {
                match self.annotations.iter_mut().find(|a| a.id == annotation.id) {
                    Some(existing) => *existing = annotation.clone(),
                    None => self.annotations.push(annotation.clone()),
                }
            }
            EventPayload::AnnotationDeleted { annotation_id } => {
                self.annotations.retain(|a| &a.id != annotation_id);
            }
        }
        self.version = event.version;
        self.updated_at = event.timestamp;
    }

    /// Fold a slice of events over a base state (a snapshot or
    /// [`CircuitState::empty`]). Pure: same inputs, same output.
    pub fn replay(mut base: CircuitState, events: &[CircuitEvent]) -> CircuitState {
        for event in events {
            base.apply(event);
        }
        base
    }
}
