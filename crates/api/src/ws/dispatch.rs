//! Per-message command dispatch.
//!
//! Permission is re-checked against the participant record on every
//! message, so a revocation bites on the offender's next command. Errors
//! bubble back to the handler, which answers the sender with an `error`
//! frame; nothing here closes the connection.

use std::sync::Arc;

use chrono::Utc;

use circuitforge_core::error::CoreError;
use circuitforge_core::event::{CircuitEvent, EventPayload};
use circuitforge_core::protocol::{ClientMessage, ServerMessage};
use circuitforge_core::session::{EditRequest, EditRequestStatus, Role};
use circuitforge_sim::{check_circuit, SimulationEngine, MAX_SIM_STEPS};

use crate::error::AppResult;
use crate::state::AppState;
use crate::ws::rooms::Room;

pub async fn handle(
    state: &AppState,
    room: &Arc<Room>,
    participant_id: &str,
    msg: ClientMessage,
) -> AppResult<()> {
    let code = room.session_code.as_str();
    if msg.requires_edit() {
        state.permissions.require_edit(code, participant_id).await?;
    }

    match msg {
        // -- Circuit mutations --------------------------------------------
        ClientMessage::ComponentAdd { component } => {
            let mut stacks = room.context.stacks.lock().await;
            let (event, _) = state
                .circuits
                .add_component(code, participant_id, component, &mut stacks)
                .await?;
            drop(stacks);
            room.broadcast(&event_message(&event)).await;
            state.sessions.touch(code).await?;
        }
        ClientMessage::ComponentMove {
            component_id,
            position,
        } => {
            let mut stacks = room.context.stacks.lock().await;
            let (event, _) = state
                .circuits
                .move_component(code, participant_id, component_id, position, &mut stacks)
                .await?;
            drop(stacks);
            room.broadcast(&event_message(&event)).await;
            state.sessions.touch(code).await?;
        }
        ClientMessage::ComponentDelete { component_id } => {
            let mut stacks = room.context.stacks.lock().await;
            let (events, _) = state
                .circuits
                .delete_component(code, participant_id, component_id, &mut stacks)
                .await?;
            drop(stacks);
            for event in &events {
                room.broadcast(&event_message(event)).await;
            }
            state.sessions.touch(code).await?;
        }
        ClientMessage::WireAdd { wire } => {
            let mut stacks = room.context.stacks.lock().await;
            let (event, _) = state
                .circuits
                .add_wire(code, participant_id, wire, &mut stacks)
                .await?;
            drop(stacks);
            room.broadcast(&event_message(&event)).await;
            state.sessions.touch(code).await?;
        }
        ClientMessage::WireDelete { wire_id } => {
            let mut stacks = room.context.stacks.lock().await;
            let (event, _) = state
                .circuits
                .delete_wire(code, participant_id, wire_id, &mut stacks)
                .await?;
            drop(stacks);
            room.broadcast(&event_message(&event)).await;
            state.sessions.touch(code).await?;
        }
        ClientMessage::AnnotationAdd { annotation } => {
            let mut stacks = room.context.stacks.lock().await;
            let (event, _) = state
                .circuits
                .add_annotation(code, participant_id, annotation, &mut stacks)
                .await?;
            drop(stacks);
            room.broadcast(&event_message(&event)).await;
            state.sessions.touch(code).await?;
        }
        ClientMessage::AnnotationDelete { annotation_id } => {
            let mut stacks = room.context.stacks.lock().await;
            let (event, _) = state
                .circuits
                .delete_annotation(code, participant_id, annotation_id, &mut stacks)
                .await?;
            drop(stacks);
            room.broadcast(&event_message(&event)).await;
            state.sessions.touch(code).await?;
        }

        // -- Undo / redo --------------------------------------------------
        ClientMessage::Undo {} => {
            let mut stacks = room.context.stacks.lock().await;
            let undone = state.circuits.undo(code, participant_id, &mut stacks).await?;
            drop(stacks);
            match undone {
                Some((event, _)) => {
                    room.broadcast(&event_message(&event)).await;
                    state.sessions.touch(code).await?;
                }
                None => {
                    return Err(CoreError::validation(
                        "NOTHING_TO_UNDO",
                        "Nothing to undo".to_string(),
                    )
                    .into());
                }
            }
        }
        ClientMessage::Redo {} => {
            let mut stacks = room.context.stacks.lock().await;
            let redone = state.circuits.redo(code, participant_id, &mut stacks).await?;
            drop(stacks);
            match redone {
                Some((event, _)) => {
                    room.broadcast(&event_message(&event)).await;
                    state.sessions.touch(code).await?;
                }
                None => {
                    return Err(CoreError::validation(
                        "NOTHING_TO_REDO",
                        "Nothing to redo".to_string(),
                    )
                    .into());
                }
            }
        }

        // -- Presence -----------------------------------------------------
        ClientMessage::CursorMove { position } => {
            room.broadcast_except(
                participant_id,
                &ServerMessage::CursorMoved {
                    participant_id: participant_id.to_string(),
                    position,
                },
            )
            .await;
        }
        ClientMessage::SelectionChange { component_ids } => {
            room.broadcast_except(
                participant_id,
                &ServerMessage::SelectionChanged {
                    participant_id: participant_id.to_string(),
                    component_ids,
                },
            )
            .await;
        }

        // -- Permissions --------------------------------------------------
        ClientMessage::RequestEdit {} => {
            let requester = state.sessions.participant(code, participant_id).await?;
            {
                let mut requests = room.context.edit_requests.lock().await;
                requests.insert(
                    participant_id.to_string(),
                    EditRequest {
                        participant_id: participant_id.to_string(),
                        requested_at: Utc::now(),
                        status: EditRequestStatus::Pending,
                    },
                );
            }
            room.send_to(
                participant_id,
                &ServerMessage::RequestSent {
                    status: EditRequestStatus::Pending,
                },
            )
            .await;
            for teacher in state
                .sessions
                .participants(code)
                .await?
                .iter()
                .filter(|p| p.role == Role::Teacher)
            {
                room.send_to(
                    &teacher.id,
                    &ServerMessage::RequestReceived {
                        participant_id: participant_id.to_string(),
                        display_name: requester.display_name.clone(),
                    },
                )
                .await;
            }
        }
        ClientMessage::Approve { participant_id: target } => {
            state.permissions.require_teacher(code, participant_id).await?;
            state.permissions.grant(code, &target).await?;
            room.context.edit_requests.lock().await.remove(&target);
            room.broadcast(&ServerMessage::PermissionGranted {
                participant_id: target,
            })
            .await;
        }
        ClientMessage::Deny { participant_id: target } => {
            state.permissions.require_teacher(code, participant_id).await?;
            room.context.edit_requests.lock().await.remove(&target);
            room.broadcast(&ServerMessage::PermissionDenied {
                participant_id: target,
            })
            .await;
        }
        ClientMessage::Revoke { participant_id: target } => {
            state.permissions.require_teacher(code, participant_id).await?;
            state.permissions.revoke(code, &target).await?;
            room.broadcast(&ServerMessage::PermissionRevoked {
                participant_id: target,
            })
            .await;
        }
        ClientMessage::Kick { participant_id: target } => {
            state.permissions.require_teacher(code, participant_id).await?;
            if target == participant_id {
                return Err(CoreError::validation(
                    "CANNOT_KICK_SELF",
                    "The teacher cannot kick themselves".to_string(),
                )
                .into());
            }
            let kicked = state.sessions.participant(code, &target).await?;
            room.send_to(
                &target,
                &ServerMessage::SessionKicked {
                    participant_id: target.clone(),
                },
            )
            .await;
            room.close(&target).await;
            state.sessions.remove_participant(code, &target).await?;
            room.broadcast(&ServerMessage::ParticipantKicked {
                participant_id: target,
                display_name: kicked.display_name,
            })
            .await;
        }

        // -- Simulation ---------------------------------------------------
        ClientMessage::SimulationStart {} => {
            let mut simulation = room.context.simulation.lock().await;
            let circuit = state.circuits.state(code).await?;
            let issues = check_circuit(&circuit);
            if !issues.is_empty() {
                drop(simulation);
                room.send_to(participant_id, &ServerMessage::SimulationError { issues })
                    .await;
                return Ok(());
            }
            let mut engine = SimulationEngine::new();
            engine.load(&circuit);
            engine.run(MAX_SIM_STEPS);
            let started = ServerMessage::SimulationStarted {
                started_by: participant_id.to_string(),
                wire_states: engine.wire_states(),
                pin_states: engine.pin_states(),
            };
            *simulation = Some(engine);
            drop(simulation);
            tracing::info!(session = %code, by = %participant_id, "Simulation started");
            room.broadcast(&started).await;
        }
        ClientMessage::SimulationStop {} => {
            *room.context.simulation.lock().await = None;
            tracing::info!(session = %code, by = %participant_id, "Simulation stopped");
            room.broadcast(&ServerMessage::SimulationStopped {
                stopped_by: participant_id.to_string(),
            })
            .await;
        }
        ClientMessage::SimulationToggle { component_id } => {
            let update = {
                let mut simulation = room.context.simulation.lock().await;
                let engine = running(&mut simulation)?;
                engine.toggle_switch(&component_id)?;
                engine.run(MAX_SIM_STEPS);
                updated(engine)
            };
            room.broadcast(&update).await;
        }
        ClientMessage::SimulationClockTick { component_id } => {
            let update = {
                let mut simulation = room.context.simulation.lock().await;
                let engine = running(&mut simulation)?;
                engine.tick_clock(&component_id)?;
                engine.run(MAX_SIM_STEPS);
                updated(engine)
            };
            room.broadcast(&update).await;
        }
        ClientMessage::SimulationStep {} => {
            let update = {
                let mut simulation = room.context.simulation.lock().await;
                let engine = running(&mut simulation)?;
                engine.step();
                updated(engine)
            };
            room.broadcast(&update).await;
        }
    }
    Ok(())
}

fn running(
    simulation: &mut Option<SimulationEngine>,
) -> Result<&mut SimulationEngine, CoreError> {
    simulation.as_mut().ok_or_else(|| {
        CoreError::validation(
            "SIMULATION_NOT_RUNNING",
            "No simulation is running".to_string(),
        )
    })
}

fn updated(engine: &SimulationEngine) -> ServerMessage {
    ServerMessage::SimulationUpdated {
        wire_states: engine.wire_states(),
        pin_states: engine.pin_states(),
    }
}

/// Map an appended event to the broadcast announcing it.
fn event_message(event: &CircuitEvent) -> ServerMessage {
    let user_id = event.user_id.clone();
    let version = event.version;
    match &event.payload {
        EventPayload::ComponentAdded { component } => ServerMessage::ComponentAdded {
            component: component.clone(),
            user_id,
            version,
        },
        EventPayload::ComponentMoved {
            component_id,
            position,
        } => ServerMessage::ComponentMoved {
            component_id: component_id.clone(),
            position: *position,
            user_id,
            version,
        },
        EventPayload::ComponentDeleted { component_id } => ServerMessage::ComponentDeleted {
            component_id: component_id.clone(),
            user_id,
            version,
        },
        EventPayload::WireAdded { wire } => ServerMessage::WireAdded {
            wire: wire.clone(),
            user_id,
            version,
        },
        EventPayload::WireDeleted { wire_id } => ServerMessage::WireDeleted {
            wire_id: wire_id.clone(),
            user_id,
            version,
        },
        EventPayload::AnnotationAdded { annotation } => ServerMessage::AnnotationAdded {
            annotation: annotation.clone(),
            user_id,
            version,
        },
        EventPayload::AnnotationDeleted { annotation_id } => ServerMessage::AnnotationDeleted {
            annotation_id: annotation_id.clone(),
            user_id,
            version,
        },
    }
}
