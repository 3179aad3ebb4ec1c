//! Event-sourced circuit mutations.
//!
//! Every mutation follows the same path: reconstruct the current state,
//! validate against it, append the event at head + 1, update the caller's
//! undo/redo stacks, and opportunistically snapshot. Callers serialize
//! mutations per session by holding the room context's stack lock across
//! the whole call, so validation always sees the latest durable state;
//! the store's compare-and-append is the backstop if that ever slips.

use std::collections::HashMap;
use std::sync::Arc;

use circuitforge_core::catalog;
use circuitforge_core::circuit::{CircuitState, Component, Position, Wire, SCHEMA_VERSION};
use circuitforge_core::error::CoreError;
use circuitforge_core::event::{CircuitEvent, EventPayload};
use circuitforge_core::validation::validate_wire;
use circuitforge_store::{EventStore, Snapshot};

use crate::error::AppResult;

/// Per-user undo stack depth; the oldest entry falls off beyond this.
pub const UNDO_STACK_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Undo/redo stacks
// ---------------------------------------------------------------------------

/// Per-user undo/redo stacks for one session.
///
/// Lives in the room context and is dropped when the room empties; undo
/// history deliberately does not survive a full disconnect of the room.
#[derive(Default)]
pub struct UndoStacks {
    undo: HashMap<String, Vec<CircuitEvent>>,
    redo: HashMap<String, Vec<CircuitEvent>>,
}

impl UndoStacks {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_undo(&mut self, user_id: &str, event: CircuitEvent) {
        let stack = self.undo.entry(user_id.to_string()).or_default();
        if stack.len() == UNDO_STACK_LIMIT {
            stack.remove(0);
        }
        stack.push(event);
    }

    fn pop_undo(&mut self, user_id: &str) -> Option<CircuitEvent> {
        self.undo.get_mut(user_id).and_then(|s| s.pop())
    }

    fn push_redo(&mut self, user_id: &str, event: CircuitEvent) {
        self.redo.entry(user_id.to_string()).or_default().push(event);
    }

    fn pop_redo(&mut self, user_id: &str) -> Option<CircuitEvent> {
        self.redo.get_mut(user_id).and_then(|s| s.pop())
    }

    fn clear_redo(&mut self, user_id: &str) {
        self.redo.remove(user_id);
    }

    pub fn undo_depth(&self, user_id: &str) -> usize {
        self.undo.get(user_id).map(|s| s.len()).unwrap_or(0)
    }

    pub fn redo_depth(&self, user_id: &str) -> usize {
        self.redo.get(user_id).map(|s| s.len()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Mutation service
// ---------------------------------------------------------------------------

pub struct CircuitService {
    events: Arc<dyn EventStore>,
    snapshot_interval: u64,
}

impl CircuitService {
    pub fn new(events: Arc<dyn EventStore>, snapshot_interval: u64) -> Self {
        Self {
            events,
            snapshot_interval,
        }
    }

    /// Reconstruct the current state: latest snapshot plus the event tail.
    pub async fn state(&self, code: &str) -> AppResult<CircuitState> {
        let (base, from) = match self.events.latest_snapshot(code).await? {
            Some(snapshot) => (snapshot.state, snapshot.version),
            None => (CircuitState::empty(code), 0),
        };
        let tail = self.events.events_since(code, from).await?;
        Ok(CircuitState::replay(base, &tail))
    }

    pub async fn add_component(
        &self,
        code: &str,
        user_id: &str,
        mut component: Component,
        stacks: &mut UndoStacks,
    ) -> AppResult<(CircuitEvent, CircuitState)> {
        if component.pins.is_empty() {
            component.pins = catalog::default_pins(component.component_type);
        }
        self.commit(code, user_id, EventPayload::ComponentAdded { component }, stacks)
            .await
    }

    pub async fn move_component(
        &self,
        code: &str,
        user_id: &str,
        component_id: String,
        position: Position,
        stacks: &mut UndoStacks,
    ) -> AppResult<(CircuitEvent, CircuitState)> {
        let state = self.state(code).await?;
        if state.component(&component_id).is_none() {
            return Err(CoreError::not_found("component", component_id).into());
        }
        self.commit(
            code,
            user_id,
            EventPayload::ComponentMoved {
                component_id,
                position,
            },
            stacks,
        )
        .await
    }

    /// Delete a component, cascading to its wires first: one `WireDeleted`
    /// per touching wire, then the `ComponentDeleted`, each separately
    /// versioned and pushed onto the undo stack in order.
    pub async fn delete_component(
        &self,
        code: &str,
        user_id: &str,
        component_id: String,
        stacks: &mut UndoStacks,
    ) -> AppResult<(Vec<CircuitEvent>, CircuitState)> {
        let state = self.state(code).await?;
        if state.component(&component_id).is_none() {
            return Err(CoreError::not_found("component", component_id).into());
        }
        let wire_ids: Vec<String> = state
            .wires_touching(&component_id)
            .iter()
            .map(|w| w.id.clone())
            .collect();

        let mut events = Vec::with_capacity(wire_ids.len() + 1);
        for wire_id in wire_ids {
            let (event, _) = self
                .commit(code, user_id, EventPayload::WireDeleted { wire_id }, stacks)
                .await?;
            events.push(event);
        }
        let (event, final_state) = self
            .commit(
                code,
                user_id,
                EventPayload::ComponentDeleted { component_id },
                stacks,
            )
            .await?;
        events.push(event);
        Ok((events, final_state))
    }

    /// Add a wire. Validation failures reject the command without
    /// appending anything.
    pub async fn add_wire(
        &self,
        code: &str,
        user_id: &str,
        wire: Wire,
        stacks: &mut UndoStacks,
    ) -> AppResult<(CircuitEvent, CircuitState)> {
        let state = self.state(code).await?;
        validate_wire(&state, &wire)?;
        self.commit(code, user_id, EventPayload::WireAdded { wire }, stacks)
            .await
    }

    pub async fn delete_wire(
        &self,
        code: &str,
        user_id: &str,
        wire_id: String,
        stacks: &mut UndoStacks,
    ) -> AppResult<(CircuitEvent, CircuitState)> {
        let state = self.state(code).await?;
        if state.wire(&wire_id).is_none() {
            return Err(CoreError::not_found("wire", wire_id).into());
        }
        self.commit(code, user_id, EventPayload::WireDeleted { wire_id }, stacks)
            .await
    }

    pub async fn add_annotation(
        &self,
        code: &str,
        user_id: &str,
        annotation: circuitforge_core::circuit::Annotation,
        stacks: &mut UndoStacks,
    ) -> AppResult<(CircuitEvent, CircuitState)> {
        self.commit(code, user_id, EventPayload::AnnotationAdded { annotation }, stacks)
            .await
    }

    pub async fn delete_annotation(
        &self,
        code: &str,
        user_id: &str,
        annotation_id: String,
        stacks: &mut UndoStacks,
    ) -> AppResult<(CircuitEvent, CircuitState)> {
        let state = self.state(code).await?;
        if state.annotation(&annotation_id).is_none() {
            return Err(CoreError::not_found("annotation", annotation_id).into());
        }
        self.commit(
            code,
            user_id,
            EventPayload::AnnotationDeleted { annotation_id },
            stacks,
        )
        .await
    }

    /// Undo the user's most recent mutation by appending its inverse as a
    /// new event. Returns `None` when there is nothing to undo or no
    /// inverse can be synthesized (in which case the entry is discarded).
    pub async fn undo(
        &self,
        code: &str,
        user_id: &str,
        stacks: &mut UndoStacks,
    ) -> AppResult<Option<(CircuitEvent, CircuitState)>> {
        let Some(target) = stacks.pop_undo(user_id) else {
            return Ok(None);
        };
        let history = self.events.events_since(code, 0).await?;
        let Some(payload) = inverse_of(&target, &history) else {
            tracing::debug!(
                session = %code,
                kind = target.payload.kind(),
                "No inverse available, dropping undo entry"
            );
            return Ok(None);
        };

        let event = self.append_new(code, user_id, payload).await?;
        stacks.push_redo(user_id, target);
        let state = self.state(code).await?;
        Ok(Some((event, state)))
    }

    /// Re-apply the most recently undone mutation as a new event.
    pub async fn redo(
        &self,
        code: &str,
        user_id: &str,
        stacks: &mut UndoStacks,
    ) -> AppResult<Option<(CircuitEvent, CircuitState)>> {
        let Some(target) = stacks.pop_redo(user_id) else {
            return Ok(None);
        };
        let event = self.append_new(code, user_id, target.payload.clone()).await?;
        stacks.push_undo(user_id, event.clone());
        let state = self.state(code).await?;
        Ok(Some((event, state)))
    }

    /// Current state as a portable export document.
    pub async fn export(&self, code: &str) -> AppResult<CircuitState> {
        self.state(code).await
    }

    /// Schema-validate an exported document. Returns the parsed state;
    /// nothing is written.
    pub fn validate_import(document: &serde_json::Value) -> Result<CircuitState, CoreError> {
        let state: CircuitState = serde_json::from_value(document.clone()).map_err(|e| {
            CoreError::validation("INVALID_CIRCUIT_FILE", format!("Not a circuit document: {e}"))
        })?;
        if state.schema_version != SCHEMA_VERSION {
            return Err(CoreError::validation(
                "INVALID_CIRCUIT_FILE",
                format!(
                    "Unsupported schema version {} (expected {SCHEMA_VERSION})",
                    state.schema_version
                ),
            ));
        }
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Append a user mutation and maintain its undo bookkeeping.
    async fn commit(
        &self,
        code: &str,
        user_id: &str,
        payload: EventPayload,
        stacks: &mut UndoStacks,
    ) -> AppResult<(CircuitEvent, CircuitState)> {
        let event = self.append_new(code, user_id, payload).await?;
        stacks.push_undo(user_id, event.clone());
        // A fresh mutation invalidates the user's redo branch.
        stacks.clear_redo(user_id);
        let state = self.state(code).await?;
        Ok((event, state))
    }

    /// Append at head + 1 and snapshot on the configured cadence.
    async fn append_new(
        &self,
        code: &str,
        user_id: &str,
        payload: EventPayload,
    ) -> AppResult<CircuitEvent> {
        let version = self.events.latest_version(code).await? + 1;
        let event = CircuitEvent {
            session_code: code.to_string(),
            version,
            user_id: user_id.to_string(),
            timestamp: chrono::Utc::now(),
            payload,
        };
        self.events.append(event.clone()).await?;
        tracing::debug!(
            session = %code,
            version,
            kind = event.payload.kind(),
            "Event appended"
        );

        if version % self.snapshot_interval == 0 {
            let state = self.state(code).await?;
            self.events
                .save_snapshot(Snapshot {
                    session_code: code.to_string(),
                    version,
                    state,
                    created_at: chrono::Utc::now(),
                })
                .await?;
            tracing::debug!(session = %code, version, "Snapshot written");
        }
        Ok(event)
    }
}

/// Synthesize the inverse of an event against the log it came from.
///
/// Deletions invert by replaying the entity's most recent `*Added` before
/// the target; moves invert to the position the component held
/// immediately before the target event.
fn inverse_of(target: &CircuitEvent, history: &[CircuitEvent]) -> Option<EventPayload> {
    match &target.payload {
        EventPayload::ComponentAdded { component } => Some(EventPayload::ComponentDeleted {
            component_id: component.id.clone(),
        }),
        EventPayload::ComponentDeleted { component_id } => {
            history.iter().rev().find_map(|e| {
                if e.version >= target.version {
                    return None;
                }
                match &e.payload {
                    EventPayload::ComponentAdded { component } if &component.id == component_id => {
                        Some(EventPayload::ComponentAdded {
                            component: component.clone(),
                        })
                    }
                    _ => None,
                }
            })
        }
        EventPayload::ComponentMoved { component_id, .. } => {
            let mut prior: Option<Position> = None;
            for e in history {
                if e.version >= target.version {
                    break;
                }
                match &e.payload {
                    EventPayload::ComponentAdded { component } if &component.id == component_id => {
                        prior = Some(component.position);
                    }
                    EventPayload::ComponentMoved {
                        component_id: id,
                        position,
                    } if id == component_id => {
                        prior = Some(*position);
                    }
                    _ => {}
                }
            }
            prior.map(|position| EventPayload::ComponentMoved {
                component_id: component_id.clone(),
                position,
            })
        }
        EventPayload::WireAdded { wire } => Some(EventPayload::WireDeleted {
            wire_id: wire.id.clone(),
        }),
        EventPayload::WireDeleted { wire_id } => history.iter().rev().find_map(|e| {
            if e.version >= target.version {
                return None;
            }
            match &e.payload {
                EventPayload::WireAdded { wire } if &wire.id == wire_id => {
                    Some(EventPayload::WireAdded { wire: wire.clone() })
                }
                _ => None,
            }
        }),
        EventPayload::AnnotationAdded { annotation } => Some(EventPayload::AnnotationDeleted {
            annotation_id: annotation.id.clone(),
        }),
        EventPayload::AnnotationDeleted { annotation_id } => {
            history.iter().rev().find_map(|e| {
                if e.version >= target.version {
                    return None;
                }
                match &e.payload {
                    EventPayload::AnnotationAdded { annotation }
                        if &annotation.id == annotation_id =>
                    {
                        Some(EventPayload::AnnotationAdded {
                            annotation: annotation.clone(),
                        })
                    }
                    _ => None,
                }
            })
        }
    }
}
