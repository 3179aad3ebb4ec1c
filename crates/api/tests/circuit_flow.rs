//! End-to-end mutation, undo/redo, and snapshot behaviour of the
//! circuit service against the in-memory event store.

use std::sync::Arc;

use assert_matches::assert_matches;
use tokio::sync::Mutex;

use circuitforge_api::services::circuit::{CircuitService, UndoStacks};
use circuitforge_core::catalog::instantiate;
use circuitforge_core::circuit::{ComponentType, Position, Wire};
use circuitforge_core::event::EventPayload;
use circuitforge_store::{EventStore, MemoryEventStore};

fn service(interval: u64) -> (CircuitService, Arc<MemoryEventStore>) {
    let store = Arc::new(MemoryEventStore::new());
    (CircuitService::new(store.clone(), interval), store)
}

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

#[tokio::test]
async fn undo_reverts_a_move_and_redo_reapplies_it() {
    let (service, _) = service(50);
    let mut stacks = UndoStacks::new();

    service
        .add_component(
            "S1",
            "u1",
            instantiate("g1", ComponentType::And2, 10.0, 10.0),
            &mut stacks,
        )
        .await
        .unwrap();
    service
        .move_component(
            "S1",
            "u1",
            "g1".to_string(),
            Position { x: 50.0, y: 60.0 },
            &mut stacks,
        )
        .await
        .unwrap();

    // Undo appends a compensating move, never rewrites history.
    let (event, state) = service.undo("S1", "u1", &mut stacks).await.unwrap().unwrap();
    assert_eq!(event.version, 3);
    assert_matches!(
        &event.payload,
        EventPayload::ComponentMoved { position, .. } if position.x == 10.0
    );
    assert_eq!(state.component("g1").unwrap().position.x, 10.0);

    let (event, state) = service.redo("S1", "u1", &mut stacks).await.unwrap().unwrap();
    assert_eq!(event.version, 4);
    assert_eq!(state.component("g1").unwrap().position.x, 50.0);
}

#[tokio::test]
async fn undo_of_an_add_deletes_and_its_redo_restores() {
    let (service, _) = service(50);
    let mut stacks = UndoStacks::new();

    service
        .add_component(
            "S1",
            "u1",
            instantiate("g1", ComponentType::Not, 0.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();

    let (event, state) = service.undo("S1", "u1", &mut stacks).await.unwrap().unwrap();
    assert_matches!(&event.payload, EventPayload::ComponentDeleted { component_id } if component_id == "g1");
    assert!(state.components.is_empty());

    let (_, state) = service.redo("S1", "u1", &mut stacks).await.unwrap().unwrap();
    assert!(state.component("g1").is_some());
}

#[tokio::test]
async fn empty_stacks_undo_and_redo_are_none() {
    let (service, _) = service(50);
    let mut stacks = UndoStacks::new();
    assert!(service.undo("S1", "u1", &mut stacks).await.unwrap().is_none());
    assert!(service.redo("S1", "u1", &mut stacks).await.unwrap().is_none());
}

#[tokio::test]
async fn a_fresh_mutation_clears_the_redo_branch() {
    let (service, _) = service(50);
    let mut stacks = UndoStacks::new();

    service
        .add_component(
            "S1",
            "u1",
            instantiate("g1", ComponentType::Not, 0.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();
    service.undo("S1", "u1", &mut stacks).await.unwrap().unwrap();

    service
        .add_component(
            "S1",
            "u1",
            instantiate("g2", ComponentType::Not, 5.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();
    assert!(service.redo("S1", "u1", &mut stacks).await.unwrap().is_none());
}

#[tokio::test]
async fn stacks_are_independent_per_user() {
    let (service, _) = service(50);
    let mut stacks = UndoStacks::new();

    service
        .add_component(
            "S1",
            "alice",
            instantiate("g1", ComponentType::Not, 0.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();

    // Bob has nothing of his own to undo.
    assert!(service.undo("S1", "bob", &mut stacks).await.unwrap().is_none());
    assert!(service.undo("S1", "alice", &mut stacks).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_a_component_cascades_to_its_wires() {
    let (service, store) = service(50);
    let mut stacks = UndoStacks::new();

    service
        .add_component(
            "S1",
            "u1",
            instantiate("sw", ComponentType::SwitchToggle, 0.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();
    service
        .add_component(
            "S1",
            "u1",
            instantiate("led", ComponentType::LedRed, 40.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();
    service
        .add_wire("S1", "u1", wire("w1", "sw", "OUT", "led", "IN"), &mut stacks)
        .await
        .unwrap();

    let (events, state) = service
        .delete_component("S1", "u1", "sw".to_string(), &mut stacks)
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_matches!(&events[0].payload, EventPayload::WireDeleted { wire_id } if wire_id == "w1");
    assert_matches!(&events[1].payload, EventPayload::ComponentDeleted { .. });
    assert!(state.wires.is_empty());
    assert!(state.component("led").is_some());
    assert_eq!(store.latest_version("S1").await.unwrap(), 5);
}

#[tokio::test]
async fn rejected_wires_append_no_event() {
    let (service, store) = service(50);
    let mut stacks = UndoStacks::new();

    service
        .add_component(
            "S1",
            "u1",
            instantiate("sw", ComponentType::SwitchToggle, 0.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();

    // Dangling endpoint.
    let result = service
        .add_wire("S1", "u1", wire("w1", "sw", "OUT", "ghost", "IN"), &mut stacks)
        .await;
    assert!(result.is_err());
    assert_eq!(store.latest_version("S1").await.unwrap(), 1);
}

#[tokio::test]
async fn second_wire_into_the_same_input_is_rejected() {
    let (service, store) = service(50);
    let mut stacks = UndoStacks::new();

    for (id, ty, x) in [
        ("a", ComponentType::SwitchToggle, 0.0),
        ("b", ComponentType::SwitchToggle, 0.0),
        ("led", ComponentType::LedRed, 40.0),
    ] {
        service
            .add_component("S1", "u1", instantiate(id, ty, x, 0.0), &mut stacks)
            .await
            .unwrap();
    }
    service
        .add_wire("S1", "u1", wire("w1", "a", "OUT", "led", "IN"), &mut stacks)
        .await
        .unwrap();

    let result = service
        .add_wire("S1", "u1", wire("w2", "b", "OUT", "led", "IN"), &mut stacks)
        .await;
    assert!(result.is_err());
    assert_eq!(store.latest_version("S1").await.unwrap(), 4);
}

#[tokio::test]
async fn concurrent_mutations_yield_contiguous_versions() {
    let (service, store) = service(50);
    let service = Arc::new(service);
    let stacks = Arc::new(Mutex::new(UndoStacks::new()));

    let mut handles = Vec::new();
    for i in 0..10 {
        let service = service.clone();
        let stacks = stacks.clone();
        handles.push(tokio::spawn(async move {
            let mut stacks = stacks.lock().await;
            service
                .add_component(
                    "S1",
                    "u1",
                    instantiate(&format!("g{i}"), ComponentType::Not, i as f64, 0.0),
                    &mut stacks,
                )
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.latest_version("S1").await.unwrap(), 10);
    let events = store.events_since("S1", 0).await.unwrap();
    let versions: Vec<u64> = events.iter().map(|e| e.version).collect();
    assert_eq!(versions, (1..=10).collect::<Vec<u64>>());
}

#[tokio::test]
async fn snapshots_are_written_on_cadence_and_replay_matches() {
    let (service, store) = service(2);
    let mut stacks = UndoStacks::new();

    for i in 0..5 {
        service
            .add_component(
                "S1",
                "u1",
                instantiate(&format!("g{i}"), ComponentType::Not, i as f64, 0.0),
                &mut stacks,
            )
            .await
            .unwrap();
    }

    let snapshot = store.latest_snapshot("S1").await.unwrap().unwrap();
    assert_eq!(snapshot.version, 4);

    // State reconstructed from snapshot + tail equals a full replay.
    let from_snapshot = service.state("S1").await.unwrap();
    let full = circuitforge_core::circuit::CircuitState::replay(
        circuitforge_core::circuit::CircuitState::empty("S1"),
        &store.events_since("S1", 0).await.unwrap(),
    );
    assert_eq!(from_snapshot, full);
    assert_eq!(from_snapshot.version, 5);
}

#[tokio::test]
async fn import_validation_round_trips_an_export() {
    let (service, _) = service(50);
    let mut stacks = UndoStacks::new();

    service
        .add_component(
            "S1",
            "u1",
            instantiate("sw", ComponentType::SwitchToggle, 0.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();
    service
        .add_component(
            "S1",
            "u1",
            instantiate("led", ComponentType::LedRed, 40.0, 0.0),
            &mut stacks,
        )
        .await
        .unwrap();
    let mut routed = wire("w1", "sw", "OUT", "led", "IN");
    routed.waypoints = vec![Position { x: 20.0, y: 5.0 }];
    service
        .add_wire("S1", "u1", routed, &mut stacks)
        .await
        .unwrap();

    let exported = service.export("S1").await.unwrap();
    let document = serde_json::to_value(&exported).unwrap();
    let parsed = CircuitService::validate_import(&document).unwrap();
    assert_eq!(parsed, exported);
    assert_eq!(parsed.wire("w1").unwrap().waypoints.len(), 1);

    let garbage = serde_json::json!({"hello": "world"});
    assert!(CircuitService::validate_import(&garbage).is_err());
}
