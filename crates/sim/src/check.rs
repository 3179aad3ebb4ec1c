//! Pre-run completeness check.
//!
//! Run before a simulation starts; a circuit with any issue does not
//! start. Issues come back in a stable order (floating inputs, then
//! output conflicts, then cycles) so clients can present them
//! consistently.

use std::collections::{HashMap, HashSet, VecDeque};

use circuitforge_core::circuit::{CircuitState, PinDirection};
use circuitforge_core::protocol::{IssueCode, SimulationIssue};

/// Validate that a circuit is simulatable.
pub fn check_circuit(circuit: &CircuitState) -> Vec<SimulationIssue> {
    let mut issues = Vec::new();

    // Driver count per input pin.
    let mut drivers: HashMap<(&str, &str), usize> = HashMap::new();
    for wire in &circuit.wires {
        *drivers
            .entry((wire.to_component_id.as_str(), wire.to_pin_id.as_str()))
            .or_default() += 1;
    }

    // Floating inputs: every input pin needs a driver. Signal sources
    // have no input pins, so they pass trivially.
    for component in &circuit.components {
        for pin in &component.pins {
            if pin.direction != PinDirection::Input {
                continue;
            }
            if !drivers.contains_key(&(component.id.as_str(), pin.id.as_str())) {
                issues.push(SimulationIssue {
                    code: IssueCode::FloatingInput,
                    message: format!(
                        "Input pin {} on component {} is not connected",
                        pin.id, component.id
                    ),
                    component_id: Some(component.id.clone()),
                    pin_id: Some(pin.id.clone()),
                });
            }
        }
    }

    // Output conflicts: fan-in is 1. The mutation layer enforces this,
    // but imported circuits come from outside it.
    for component in &circuit.components {
        for pin in &component.pins {
            if pin.direction != PinDirection::Input {
                continue;
            }
            if let Some(&count) = drivers.get(&(component.id.as_str(), pin.id.as_str())) {
                if count > 1 {
                    issues.push(SimulationIssue {
                        code: IssueCode::OutputConflict,
                        message: format!(
                            "Input pin {} on component {} has {count} drivers",
                            pin.id, component.id
                        ),
                        component_id: Some(component.id.clone()),
                        pin_id: Some(pin.id.clone()),
                    });
                }
            }
        }
    }

    if let Some(cycle_members) = find_cycle(circuit) {
        issues.push(SimulationIssue {
            code: IssueCode::CycleDetected,
            message: format!(
                "Circuit contains a feedback loop through: {}",
                cycle_members.join(", ")
            ),
            component_id: cycle_members.first().cloned(),
            pin_id: None,
        });
    }

    issues
}

/// Kahn's algorithm over the component graph. Returns the components left
/// with unresolved dependencies (the cycle and everything trapped behind
/// it), sorted for stable output.
fn find_cycle(circuit: &CircuitState) -> Option<Vec<String>> {
    let mut indegree: HashMap<&str, usize> = circuit
        .components
        .iter()
        .map(|c| (c.id.as_str(), 0))
        .collect();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut seen_edges: HashSet<(&str, &str)> = HashSet::new();

    for wire in &circuit.wires {
        let edge = (wire.from_component_id.as_str(), wire.to_component_id.as_str());
        // Parallel wires between the same pair count once.
        if !seen_edges.insert(edge) {
            continue;
        }
        if let Some(degree) = indegree.get_mut(edge.1) {
            *degree += 1;
        }
        adjacency.entry(edge.0).or_default().push(edge.1);
    }

    let mut ready: VecDeque<&str> = circuit
        .components
        .iter()
        .map(|c| c.id.as_str())
        .filter(|id| indegree.get(id) == Some(&0))
        .collect();

    let mut resolved = 0;
    while let Some(id) = ready.pop_front() {
        resolved += 1;
        if let Some(next) = adjacency.get(id) {
            for &target in next {
                if let Some(degree) = indegree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(target);
                    }
                }
            }
        }
    }

    if resolved == circuit.components.len() {
        return None;
    }
    let mut remaining: Vec<String> = indegree
        .iter()
        .filter(|(_, &degree)| degree > 0)
        .map(|(id, _)| id.to_string())
        .collect();
    remaining.sort();
    Some(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuitforge_core::catalog::instantiate;
    use circuitforge_core::circuit::{ComponentType, Wire};

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

    #[test]
    fn complete_circuit_passes() {
        let mut circuit = CircuitState::empty("CHK001");
        circuit
            .components
            .push(instantiate("sw1", ComponentType::SwitchToggle, 0.0, 0.0));
        circuit
            .components
            .push(instantiate("led1", ComponentType::LedRed, 100.0, 0.0));
        circuit.wires.push(wire("w1", "sw1", "OUT", "led1", "IN"));

        assert!(check_circuit(&circuit).is_empty());
    }

    #[test]
    fn reports_every_floating_input() {
        let mut circuit = CircuitState::empty("CHK002");
        circuit
            .components
            .push(instantiate("sw1", ComponentType::SwitchToggle, 0.0, 0.0));
        circuit
            .components
            .push(instantiate("and1", ComponentType::And2, 100.0, 0.0));
        // Only A is wired; B floats.
        circuit.wires.push(wire("w1", "sw1", "OUT", "and1", "A"));

        let issues = check_circuit(&circuit);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::FloatingInput);
        assert_eq!(issues[0].component_id.as_deref(), Some("and1"));
        assert_eq!(issues[0].pin_id.as_deref(), Some("B"));
    }

    #[test]
    fn reports_multiple_drivers() {
        let mut circuit = CircuitState::empty("CHK003");
        circuit
            .components
            .push(instantiate("sw1", ComponentType::SwitchToggle, 0.0, 0.0));
        circuit
            .components
            .push(instantiate("sw2", ComponentType::SwitchToggle, 0.0, 50.0));
        circuit
            .components
            .push(instantiate("led1", ComponentType::LedRed, 100.0, 0.0));
        // Two drivers on the same input; bypasses mutation validation the
        // way an imported document could.
        circuit.wires.push(wire("w1", "sw1", "OUT", "led1", "IN"));
        circuit.wires.push(wire("w2", "sw2", "OUT", "led1", "IN"));

        let issues = check_circuit(&circuit);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::OutputConflict);
    }

    #[test]
    fn detects_a_feedback_loop() {
        let mut circuit = CircuitState::empty("CHK004");
        circuit
            .components
            .push(instantiate("not1", ComponentType::Not, 0.0, 0.0));
        circuit
            .components
            .push(instantiate("not2", ComponentType::Not, 100.0, 0.0));
        circuit.wires.push(wire("w1", "not1", "OUT", "not2", "A"));
        circuit.wires.push(wire("w2", "not2", "OUT", "not1", "A"));

        let issues = check_circuit(&circuit);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::CycleDetected);
        assert!(issues[0].message.contains("not1"));
        assert!(issues[0].message.contains("not2"));
    }

    #[test]
    fn issue_order_is_stable() {
        let mut circuit = CircuitState::empty("CHK005");
        circuit
            .components
            .push(instantiate("and1", ComponentType::And2, 0.0, 0.0));
        circuit
            .components
            .push(instantiate("not1", ComponentType::Not, 100.0, 0.0));
        circuit
            .components
            .push(instantiate("not2", ComponentType::Not, 200.0, 0.0));
        // and1 floats entirely; not1/not2 form a loop.
        circuit.wires.push(wire("w1", "not1", "OUT", "not2", "A"));
        circuit.wires.push(wire("w2", "not2", "OUT", "not1", "A"));

        let issues = check_circuit(&circuit);
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                IssueCode::FloatingInput,
                IssueCode::FloatingInput,
                IssueCode::CycleDetected,
            ]
        );
    }
}
