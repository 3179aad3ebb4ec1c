//! Static component catalog: the pins, category, and display name for
//! every [`ComponentType`]. The catalog is the single source of truth for
//! default pin layouts and for the simulator's source classification.

use serde::Serialize;

use crate::circuit::{Component, ComponentType, Pin, PinDirection, Position};

/// Catalog entry for one pin: id doubles as the display name, offsets are
/// relative to the component origin.
#[derive(Debug, Clone, Copy)]
pub struct PinDef {
    pub id: &'static str,
    pub direction: PinDirection,
    pub dx: f64,
    pub dy: f64,
}

/// Coarse grouping used by the palette UI and the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    LogicGate,
    FlipFlop,
    Combinational,
    Sequential,
    Input,
    Output,
    Passive,
    Power,
    Connector,
}

const fn input(id: &'static str, dx: f64, dy: f64) -> PinDef {
    PinDef {
        id,
        direction: PinDirection::Input,
        dx,
        dy,
    }
}

const fn output(id: &'static str, dx: f64, dy: f64) -> PinDef {
    PinDef {
        id,
        direction: PinDirection::Output,
        dx,
        dy,
    }
}

// Shared pin layouts, inputs on the left edge and outputs on the right.

const GATE_2: [PinDef; 3] = [
    input("A", 0.0, 10.0),
    input("B", 0.0, 30.0),
    output("OUT", 60.0, 20.0),
];

const GATE_3: [PinDef; 4] = [
    input("A", 0.0, 10.0),
    input("B", 0.0, 20.0),
    input("C", 0.0, 30.0),
    output("OUT", 60.0, 20.0),
];

const GATE_4: [PinDef; 5] = [
    input("A", 0.0, 5.0),
    input("B", 0.0, 15.0),
    input("C", 0.0, 25.0),
    input("D", 0.0, 35.0),
    output("OUT", 60.0, 20.0),
];

const GATE_1: [PinDef; 2] = [input("A", 0.0, 15.0), output("OUT", 50.0, 15.0)];

const SR_LATCH: [PinDef; 4] = [
    input("S", 0.0, 10.0),
    input("R", 0.0, 30.0),
    output("Q", 60.0, 10.0),
    output("Q_NOT", 60.0, 30.0),
];

const D_FLIPFLOP: [PinDef; 4] = [
    input("D", 0.0, 10.0),
    input("CLK", 0.0, 30.0),
    output("Q", 60.0, 10.0),
    output("Q_NOT", 60.0, 30.0),
];

const JK_FLIPFLOP: [PinDef; 5] = [
    input("J", 0.0, 10.0),
    input("CLK", 0.0, 20.0),
    input("K", 0.0, 30.0),
    output("Q", 60.0, 10.0),
    output("Q_NOT", 60.0, 30.0),
];

const T_FLIPFLOP: [PinDef; 4] = [
    input("T", 0.0, 10.0),
    input("CLK", 0.0, 30.0),
    output("Q", 60.0, 10.0),
    output("Q_NOT", 60.0, 30.0),
];

const MUX_2TO1: [PinDef; 4] = [
    input("A", 0.0, 10.0),
    input("B", 0.0, 30.0),
    input("S", 30.0, 50.0),
    output("OUT", 60.0, 20.0),
];

const MUX_4TO1: [PinDef; 7] = [
    input("A", 0.0, 5.0),
    input("B", 0.0, 15.0),
    input("C", 0.0, 25.0),
    input("D", 0.0, 35.0),
    input("S0", 20.0, 50.0),
    input("S1", 40.0, 50.0),
    output("OUT", 60.0, 20.0),
];

const DECODER_2TO4: [PinDef; 6] = [
    input("A0", 0.0, 10.0),
    input("A1", 0.0, 30.0),
    output("Y0", 60.0, 5.0),
    output("Y1", 60.0, 15.0),
    output("Y2", 60.0, 25.0),
    output("Y3", 60.0, 35.0),
];

const ADDER_4BIT: [PinDef; 14] = [
    input("A0", 0.0, 5.0),
    input("A1", 0.0, 15.0),
    input("A2", 0.0, 25.0),
    input("A3", 0.0, 35.0),
    input("B0", 0.0, 45.0),
    input("B1", 0.0, 55.0),
    input("B2", 0.0, 65.0),
    input("B3", 0.0, 75.0),
    input("CIN", 0.0, 85.0),
    output("S0", 80.0, 10.0),
    output("S1", 80.0, 25.0),
    output("S2", 80.0, 40.0),
    output("S3", 80.0, 55.0),
    output("COUT", 80.0, 70.0),
];

const COUNTER_4BIT: [PinDef; 6] = [
    input("CLK", 0.0, 10.0),
    input("RST", 0.0, 30.0),
    output("Q0", 70.0, 5.0),
    output("Q1", 70.0, 15.0),
    output("Q2", 70.0, 25.0),
    output("Q3", 70.0, 35.0),
];

const SHIFT_REGISTER_8BIT: [PinDef; 10] = [
    input("D", 0.0, 10.0),
    input("CLK", 0.0, 30.0),
    output("Q0", 100.0, 5.0),
    output("Q1", 100.0, 15.0),
    output("Q2", 100.0, 25.0),
    output("Q3", 100.0, 35.0),
    output("Q4", 100.0, 45.0),
    output("Q5", 100.0, 55.0),
    output("Q6", 100.0, 65.0),
    output("Q7", 100.0, 75.0),
];

const SINGLE_SOURCE: [PinDef; 1] = [output("OUT", 40.0, 15.0)];

const DIP_SWITCH_4: [PinDef; 4] = [
    output("OUT0", 40.0, 5.0),
    output("OUT1", 40.0, 15.0),
    output("OUT2", 40.0, 25.0),
    output("OUT3", 40.0, 35.0),
];

const CLOCK: [PinDef; 1] = [output("CLK", 40.0, 15.0)];

const SINGLE_SINK: [PinDef; 1] = [input("IN", 0.0, 15.0)];

const DISPLAY_7SEG: [PinDef; 7] = [
    input("A", 0.0, 5.0),
    input("B", 0.0, 15.0),
    input("C", 0.0, 25.0),
    input("D", 0.0, 35.0),
    input("E", 0.0, 45.0),
    input("F", 0.0, 55.0),
    input("G", 0.0, 65.0),
];

const PASSIVE: [PinDef; 2] = [input("IN", 0.0, 10.0), output("OUT", 50.0, 10.0)];

const POWER: [PinDef; 1] = [output("OUT", 20.0, 30.0)];

const JUNCTION: [PinDef; 3] = [
    input("IN", 0.0, 10.0),
    output("OUT1", 30.0, 0.0),
    output("OUT2", 30.0, 20.0),
];

/// Pin layout for a component type.
pub fn pin_defs(component_type: ComponentType) -> &'static [PinDef] {
    use ComponentType::*;
    match component_type {
        And2 | Or2 | Nand2 | Nor2 | Xor2 | Xnor2 => &GATE_2,
        And3 | Or3 | Nand3 | Nor3 => &GATE_3,
        And4 | Or4 => &GATE_4,
        Not | Buffer => &GATE_1,
        SrLatch => &SR_LATCH,
        DFlipFlop => &D_FLIPFLOP,
        JkFlipFlop => &JK_FLIPFLOP,
        TFlipFlop => &T_FLIPFLOP,
        Mux2To1 => &MUX_2TO1,
        Mux4To1 => &MUX_4TO1,
        Decoder2To4 => &DECODER_2TO4,
        Adder4Bit => &ADDER_4BIT,
        Counter4Bit => &COUNTER_4BIT,
        ShiftRegister8Bit => &SHIFT_REGISTER_8BIT,
        SwitchToggle | SwitchPush | ConstHigh | ConstLow => &SINGLE_SOURCE,
        DipSwitch4 => &DIP_SWITCH_4,
        Clock => &CLOCK,
        LedRed | LedGreen | LedYellow | LedBlue | Buzzer | Probe => &SINGLE_SINK,
        Display7Seg => &DISPLAY_7SEG,
        Resistor | Capacitor | Diode => &PASSIVE,
        Vcc5V | Vcc3V3 | Ground | Battery => &POWER,
        Junction => &JUNCTION,
    }
}

pub fn category(component_type: ComponentType) -> Category {
    use ComponentType::*;
    match component_type {
        And2 | And3 | And4 | Or2 | Or3 | Or4 | Not | Buffer | Nand2 | Nand3 | Nor2 | Nor3
        | Xor2 | Xnor2 => Category::LogicGate,
        SrLatch | DFlipFlop | JkFlipFlop | TFlipFlop => Category::FlipFlop,
        Mux2To1 | Mux4To1 | Decoder2To4 | Adder4Bit => Category::Combinational,
        Counter4Bit | ShiftRegister8Bit => Category::Sequential,
        SwitchToggle | SwitchPush | DipSwitch4 | Clock | ConstHigh | ConstLow => Category::Input,
        LedRed | LedGreen | LedYellow | LedBlue | Display7Seg | Buzzer => Category::Output,
        Resistor | Capacitor | Diode => Category::Passive,
        Vcc5V | Vcc3V3 | Ground | Battery => Category::Power,
        Junction | Probe => Category::Connector,
    }
}

/// Signal sources drive their outputs themselves (switches, clocks,
/// constants, power rails); everything else derives outputs from inputs.
pub fn is_signal_source(component_type: ComponentType) -> bool {
    matches!(
        category(component_type),
        Category::Input | Category::Power
    )
}

/// Materialize the catalog pins for a new component instance.
pub fn default_pins(component_type: ComponentType) -> Vec<Pin> {
    pin_defs(component_type)
        .iter()
        .map(|def| Pin {
            id: def.id.to_string(),
            name: def.id.to_string(),
            direction: def.direction,
            position: Position {
                x: def.dx,
                y: def.dy,
            },
        })
        .collect()
}

/// Make a component instance at a position with catalog pins. Intended
/// for tests and import tooling; interactive clients send full components.
pub fn instantiate(
    id: impl Into<String>,
    component_type: ComponentType,
    x: f64,
    y: f64,
) -> Component {
    Component {
        id: id.into(),
        component_type,
        position: Position { x, y },
        rotation: Default::default(),
        properties: serde_json::Map::new(),
        pins: default_pins(component_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_pins() {
        use ComponentType::*;
        let all = [
            And2, And3, And4, Or2, Or3, Or4, Not, Buffer, Nand2, Nand3, Nor2, Nor3, Xor2,
            Xnor2, SrLatch, DFlipFlop, JkFlipFlop, TFlipFlop, Mux2To1, Mux4To1, Decoder2To4,
            Adder4Bit, Counter4Bit, ShiftRegister8Bit, SwitchToggle, SwitchPush, DipSwitch4,
            Clock, ConstHigh, ConstLow, LedRed, LedGreen, LedYellow, LedBlue, Display7Seg,
            Buzzer, Resistor, Capacitor, Diode, Vcc5V, Vcc3V3, Ground, Battery, Junction, Probe,
        ];
        for t in all {
            assert!(!pin_defs(t).is_empty(), "{t:?} has no pins");
        }
    }

    #[test]
    fn sources_have_no_input_pins() {
        use ComponentType::*;
        for t in [SwitchToggle, Clock, ConstHigh, ConstLow, Vcc5V, Ground, DipSwitch4] {
            assert!(is_signal_source(t));
            assert!(pin_defs(t)
                .iter()
                .all(|p| p.direction == PinDirection::Output));
        }
    }

    #[test]
    fn gates_are_not_sources() {
        assert!(!is_signal_source(ComponentType::And2));
        assert!(!is_signal_source(ComponentType::LedRed));
    }

    #[test]
    fn default_pins_copy_the_layout() {
        let pins = default_pins(ComponentType::DFlipFlop);
        assert_eq!(pins.len(), 4);
        assert_eq!(pins[0].id, "D");
        assert_eq!(pins[1].direction, PinDirection::Input);
        assert_eq!(pins[2].id, "Q");
        assert_eq!(pins[2].direction, PinDirection::Output);
    }
}
