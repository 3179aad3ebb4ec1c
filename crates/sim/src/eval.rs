//! Per-component evaluation: combinational truth tables and edge-triggered
//! sequential elements.
//!
//! Output lists are in a fixed order per type so the scheduling sequence,
//! and therefore the whole simulation, is reproducible.

use std::collections::HashMap;

use circuitforge_core::circuit::ComponentType;
use circuitforge_core::signal::Signal;

/// Typed internal state for stateful components; combinational parts
/// carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InternalState {
    Combinational,
    Latch { q: Signal },
    FlipFlop { q: Signal, prev_clk: Signal },
    Counter { count: u8, prev_clk: Signal },
    Shift { bits: u8, prev_clk: Signal },
}

pub(crate) fn initial_state(component_type: ComponentType) -> InternalState {
    use ComponentType::*;
    match component_type {
        SrLatch => InternalState::Latch { q: Signal::Low },
        DFlipFlop | JkFlipFlop | TFlipFlop => InternalState::FlipFlop {
            q: Signal::Low,
            prev_clk: Signal::Low,
        },
        Counter4Bit => InternalState::Counter {
            count: 0,
            prev_clk: Signal::Low,
        },
        ShiftRegister8Bit => InternalState::Shift {
            bits: 0,
            prev_clk: Signal::Low,
        },
        _ => InternalState::Combinational,
    }
}

// ---------------------------------------------------------------------------
// Four-valued combinators
// ---------------------------------------------------------------------------

/// AND over four-valued inputs: a Low input dominates, all-High gives
/// High, anything else is Undefined.
fn and_all(values: &[Signal]) -> Signal {
    if values.iter().any(|v| *v == Signal::Low) {
        Signal::Low
    } else if values.iter().all(|v| *v == Signal::High) {
        Signal::High
    } else {
        Signal::Undefined
    }
}

/// OR over four-valued inputs: a High input dominates.
fn or_all(values: &[Signal]) -> Signal {
    if values.iter().any(|v| *v == Signal::High) {
        Signal::High
    } else if values.iter().all(|v| *v == Signal::Low) {
        Signal::Low
    } else {
        Signal::Undefined
    }
}

fn xor_all(values: &[Signal]) -> Signal {
    let mut parity = false;
    for v in values {
        match v.as_bool() {
            Some(b) => parity ^= b,
            None => return Signal::Undefined,
        }
    }
    Signal::from_bool(parity)
}

/// Buffer semantics: driven levels pass, Z and X become X.
fn pass(value: Signal) -> Signal {
    match value {
        Signal::High | Signal::Low => value,
        _ => Signal::Undefined,
    }
}

fn toggled(q: Signal) -> Signal {
    match q {
        Signal::High => Signal::Low,
        Signal::Low => Signal::High,
        _ => Signal::Undefined,
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Compute the outputs of one component from its current input levels.
///
/// Sequential elements trigger on the Low-to-High clock transition
/// recorded against their stored `prev_clk`; the SR latch is
/// level-sensitive. Signal sources return no outputs here because their
/// levels are driven externally (init, toggle, tick).
pub(crate) fn evaluate(
    component_type: ComponentType,
    inputs: &HashMap<String, Signal>,
    state: &mut InternalState,
) -> Vec<(&'static str, Signal)> {
    use ComponentType::*;

    let get = |id: &str| -> Signal { inputs.get(id).copied().unwrap_or(Signal::Floating) };

    match component_type {
        And2 => vec![("OUT", and_all(&[get("A"), get("B")]))],
        And3 => vec![("OUT", and_all(&[get("A"), get("B"), get("C")]))],
        And4 => vec![("OUT", and_all(&[get("A"), get("B"), get("C"), get("D")]))],
        Or2 => vec![("OUT", or_all(&[get("A"), get("B")]))],
        Or3 => vec![("OUT", or_all(&[get("A"), get("B"), get("C")]))],
        Or4 => vec![("OUT", or_all(&[get("A"), get("B"), get("C"), get("D")]))],
        Nand2 => vec![("OUT", and_all(&[get("A"), get("B")]).invert())],
        Nand3 => vec![("OUT", and_all(&[get("A"), get("B"), get("C")]).invert())],
        Nor2 => vec![("OUT", or_all(&[get("A"), get("B")]).invert())],
        Nor3 => vec![("OUT", or_all(&[get("A"), get("B"), get("C")]).invert())],
        Xor2 => vec![("OUT", xor_all(&[get("A"), get("B")]))],
        Xnor2 => vec![("OUT", xor_all(&[get("A"), get("B")]).invert())],
        Not => vec![("OUT", get("A").invert())],
        Buffer => vec![("OUT", pass(get("A")))],

        Mux2To1 => {
            let out = match get("S") {
                Signal::High => pass(get("B")),
                Signal::Low => pass(get("A")),
                _ => Signal::Undefined,
            };
            vec![("OUT", out)]
        }
        Mux4To1 => {
            let out = match (get("S1").as_bool(), get("S0").as_bool()) {
                (Some(s1), Some(s0)) => {
                    let selected = match (s1, s0) {
                        (false, false) => get("A"),
                        (false, true) => get("B"),
                        (true, false) => get("C"),
                        (true, true) => get("D"),
                    };
                    pass(selected)
                }
                _ => Signal::Undefined,
            };
            vec![("OUT", out)]
        }
        Decoder2To4 => {
            match (get("A1").as_bool(), get("A0").as_bool()) {
                (Some(a1), Some(a0)) => {
                    let index = (a1 as usize) * 2 + a0 as usize;
                    let outs = ["Y0", "Y1", "Y2", "Y3"];
                    outs.iter()
                        .enumerate()
                        .map(|(i, name)| (*name, Signal::from_bool(i == index)))
                        .collect()
                }
                _ => vec![
                    ("Y0", Signal::Undefined),
                    ("Y1", Signal::Undefined),
                    ("Y2", Signal::Undefined),
                    ("Y3", Signal::Undefined),
                ],
            }
        }
        Adder4Bit => {
            let word = |prefix: &str| -> Option<u8> {
                let mut value = 0u8;
                for bit in 0..4 {
                    let level = get(&format!("{prefix}{bit}"));
                    value |= (level.as_bool()? as u8) << bit;
                }
                Some(value)
            };
            match (word("A"), word("B"), get("CIN").as_bool()) {
                (Some(a), Some(b), Some(cin)) => {
                    let sum = a as u16 + b as u16 + cin as u16;
                    vec![
                        ("S0", Signal::from_bool(sum & 1 != 0)),
                        ("S1", Signal::from_bool(sum & 2 != 0)),
                        ("S2", Signal::from_bool(sum & 4 != 0)),
                        ("S3", Signal::from_bool(sum & 8 != 0)),
                        ("COUT", Signal::from_bool(sum & 16 != 0)),
                    ]
                }
                _ => vec![
                    ("S0", Signal::Undefined),
                    ("S1", Signal::Undefined),
                    ("S2", Signal::Undefined),
                    ("S3", Signal::Undefined),
                    ("COUT", Signal::Undefined),
                ],
            }
        }

        SrLatch => {
            let InternalState::Latch { q } = state else {
                return Vec::new();
            };
            match (get("S"), get("R")) {
                (Signal::High, Signal::High) => *q = Signal::Undefined,
                (Signal::High, _) => *q = Signal::High,
                (_, Signal::High) => *q = Signal::Low,
                _ => {} // hold
            }
            vec![("Q", *q), ("Q_NOT", toggled(*q))]
        }
        DFlipFlop => {
            let InternalState::FlipFlop { q, prev_clk } = state else {
                return Vec::new();
            };
            let clk = get("CLK");
            if *prev_clk == Signal::Low && clk == Signal::High {
                *q = pass(get("D"));
            }
            *prev_clk = clk;
            vec![("Q", *q), ("Q_NOT", toggled(*q))]
        }
        JkFlipFlop => {
            let InternalState::FlipFlop { q, prev_clk } = state else {
                return Vec::new();
            };
            let clk = get("CLK");
            if *prev_clk == Signal::Low && clk == Signal::High {
                *q = match (get("J").as_bool(), get("K").as_bool()) {
                    (Some(true), Some(true)) => toggled(*q),
                    (Some(true), Some(false)) => Signal::High,
                    (Some(false), Some(true)) => Signal::Low,
                    (Some(false), Some(false)) => *q,
                    _ => Signal::Undefined,
                };
            }
            *prev_clk = clk;
            vec![("Q", *q), ("Q_NOT", toggled(*q))]
        }
        TFlipFlop => {
            let InternalState::FlipFlop { q, prev_clk } = state else {
                return Vec::new();
            };
            let clk = get("CLK");
            if *prev_clk == Signal::Low && clk == Signal::High {
                *q = match get("T") {
                    Signal::High => toggled(*q),
                    Signal::Low => *q,
                    _ => Signal::Undefined,
                };
            }
            *prev_clk = clk;
            vec![("Q", *q), ("Q_NOT", toggled(*q))]
        }
        Counter4Bit => {
            let InternalState::Counter { count, prev_clk } = state else {
                return Vec::new();
            };
            let clk = get("CLK");
            if get("RST") == Signal::High {
                *count = 0;
            } else if *prev_clk == Signal::Low && clk == Signal::High {
                *count = (*count + 1) % 16;
            }
            *prev_clk = clk;
            let count = *count;
            vec![
                ("Q0", Signal::from_bool(count & 1 != 0)),
                ("Q1", Signal::from_bool(count & 2 != 0)),
                ("Q2", Signal::from_bool(count & 4 != 0)),
                ("Q3", Signal::from_bool(count & 8 != 0)),
            ]
        }
        ShiftRegister8Bit => {
            let InternalState::Shift { bits, prev_clk } = state else {
                return Vec::new();
            };
            let clk = get("CLK");
            if *prev_clk == Signal::Low && clk == Signal::High {
                let incoming = matches!(get("D"), Signal::High) as u8;
                *bits = (*bits << 1) | incoming;
            }
            *prev_clk = clk;
            let bits = *bits;
            (0..8)
                .map(|i| {
                    let names = ["Q0", "Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7"];
                    (names[i], Signal::from_bool(bits & (1 << i) != 0))
                })
                .collect()
        }

        // Pass-through parts: logically transparent.
        Resistor | Capacitor | Diode => vec![("OUT", pass(get("IN")))],
        Junction => {
            let value = get("IN");
            vec![("OUT1", value), ("OUT2", value)]
        }

        // Sources are driven externally; sinks have no outputs.
        SwitchToggle | SwitchPush | DipSwitch4 | Clock | ConstHigh | ConstLow | Vcc5V
        | Vcc3V3 | Ground | Battery | LedRed | LedGreen | LedYellow | LedBlue | Display7Seg
        | Buzzer | Probe => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, Signal)]) -> HashMap<String, Signal> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn combinational(
        component_type: ComponentType,
        pairs: &[(&str, Signal)],
    ) -> Vec<(&'static str, Signal)> {
        let mut state = InternalState::Combinational;
        evaluate(component_type, &inputs(pairs), &mut state)
    }

    #[test]
    fn and_truth_table_with_unknowns() {
        use Signal::*;
        let cases = [
            (High, High, High),
            (High, Low, Low),
            (Low, Undefined, Low),     // Low dominates
            (High, Undefined, Undefined),
            (High, Floating, Undefined),
        ];
        for (a, b, expected) in cases {
            let out = combinational(ComponentType::And2, &[("A", a), ("B", b)]);
            assert_eq!(out, vec![("OUT", expected)], "AND({a:?}, {b:?})");
        }
    }

    #[test]
    fn or_high_dominates() {
        use Signal::*;
        let out = combinational(ComponentType::Or2, &[("A", High), ("B", Undefined)]);
        assert_eq!(out, vec![("OUT", High)]);
        let out = combinational(ComponentType::Or2, &[("A", Low), ("B", Floating)]);
        assert_eq!(out, vec![("OUT", Undefined)]);
    }

    #[test]
    fn xor_requires_defined_inputs() {
        use Signal::*;
        let out = combinational(ComponentType::Xor2, &[("A", High), ("B", Low)]);
        assert_eq!(out, vec![("OUT", High)]);
        let out = combinational(ComponentType::Xor2, &[("A", High), ("B", Floating)]);
        assert_eq!(out, vec![("OUT", Undefined)]);
    }

    #[test]
    fn mux_selects_b_when_high() {
        use Signal::*;
        let out = combinational(
            ComponentType::Mux2To1,
            &[("A", Low), ("B", High), ("S", High)],
        );
        assert_eq!(out, vec![("OUT", High)]);
        let out = combinational(
            ComponentType::Mux2To1,
            &[("A", Low), ("B", High), ("S", Low)],
        );
        assert_eq!(out, vec![("OUT", Low)]);
    }

    #[test]
    fn adder_adds_with_carry() {
        use Signal::*;
        // 5 + 11 + 1 = 17 -> sum 1, carry out.
        let out = combinational(
            ComponentType::Adder4Bit,
            &[
                ("A0", High), ("A1", Low), ("A2", High), ("A3", Low),
                ("B0", High), ("B1", High), ("B2", Low), ("B3", High),
                ("CIN", High),
            ],
        );
        assert_eq!(
            out,
            vec![
                ("S0", High),
                ("S1", Low),
                ("S2", Low),
                ("S3", Low),
                ("COUT", High),
            ]
        );
    }

    #[test]
    fn d_flip_flop_latches_on_rising_edge_only() {
        use Signal::*;
        let mut state = initial_state(ComponentType::DFlipFlop);

        // Clock Low, D High: nothing latched.
        let out = evaluate(
            ComponentType::DFlipFlop,
            &inputs(&[("D", High), ("CLK", Low)]),
            &mut state,
        );
        assert_eq!(out[0], ("Q", Low));

        // Rising edge latches D.
        let out = evaluate(
            ComponentType::DFlipFlop,
            &inputs(&[("D", High), ("CLK", High)]),
            &mut state,
        );
        assert_eq!(out[0], ("Q", High));

        // D falls while clock stays High: Q holds.
        let out = evaluate(
            ComponentType::DFlipFlop,
            &inputs(&[("D", Low), ("CLK", High)]),
            &mut state,
        );
        assert_eq!(out[0], ("Q", High));
    }

    #[test]
    fn sr_latch_is_level_sensitive_and_flags_both_high() {
        use Signal::*;
        let mut state = initial_state(ComponentType::SrLatch);

        let out = evaluate(
            ComponentType::SrLatch,
            &inputs(&[("S", High), ("R", Low)]),
            &mut state,
        );
        assert_eq!(out[0], ("Q", High));

        // Hold.
        let out = evaluate(
            ComponentType::SrLatch,
            &inputs(&[("S", Low), ("R", Low)]),
            &mut state,
        );
        assert_eq!(out[0], ("Q", High));

        // Both asserted: undefined.
        let out = evaluate(
            ComponentType::SrLatch,
            &inputs(&[("S", High), ("R", High)]),
            &mut state,
        );
        assert_eq!(out[0], ("Q", Undefined));
    }

    #[test]
    fn counter_counts_and_wraps() {
        use Signal::*;
        let mut state = initial_state(ComponentType::Counter4Bit);
        for _ in 0..17 {
            evaluate(
                ComponentType::Counter4Bit,
                &inputs(&[("CLK", Low), ("RST", Low)]),
                &mut state,
            );
            evaluate(
                ComponentType::Counter4Bit,
                &inputs(&[("CLK", High), ("RST", Low)]),
                &mut state,
            );
        }
        // 17 mod 16 = 1.
        assert_eq!(state, InternalState::Counter { count: 1, prev_clk: High });

        let out = evaluate(
            ComponentType::Counter4Bit,
            &inputs(&[("CLK", High), ("RST", High)]),
            &mut state,
        );
        assert_eq!(out[0], ("Q0", Low));
    }

    #[test]
    fn shift_register_shifts_toward_high_bits() {
        use Signal::*;
        let mut state = initial_state(ComponentType::ShiftRegister8Bit);
        for d in [High, Low, High] {
            evaluate(
                ComponentType::ShiftRegister8Bit,
                &inputs(&[("D", d), ("CLK", Low)]),
                &mut state,
            );
            evaluate(
                ComponentType::ShiftRegister8Bit,
                &inputs(&[("D", d), ("CLK", High)]),
                &mut state,
            );
        }
        // Shifted in 1, 0, 1: newest bit at Q0.
        assert_eq!(state, InternalState::Shift { bits: 0b101, prev_clk: High });
    }
}
