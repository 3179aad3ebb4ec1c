//! WebSocket message protocol.
//!
//! Every frame is JSON with a `type` tag and a `payload` object (empty for
//! messages that carry no data). Client-to-server and server-to-client
//! vocabularies are distinct closed unions; an unknown `type` fails to
//! parse and is answered with an `error` frame, never a disconnect.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::circuit::{Annotation, CircuitState, Component, Position, Wire};
use crate::session::Participant;
use crate::signal::Signal;

/// Signal level per wire id.
pub type WireStates = HashMap<String, Signal>;

/// Signal level per pin, grouped by component id.
pub type PinStates = HashMap<String, HashMap<String, Signal>>;

// ---------------------------------------------------------------------------
// Completeness-check diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// An input pin has no driver.
    FloatingInput,
    /// An input pin has more than one driver.
    OutputConflict,
    /// The component graph contains a feedback loop.
    CycleDetected,
}

/// One diagnostic from the pre-run completeness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "circuit:component:add", rename_all = "camelCase")]
    ComponentAdd { component: Component },
    #[serde(rename = "circuit:component:move", rename_all = "camelCase")]
    ComponentMove {
        component_id: String,
        position: Position,
    },
    #[serde(rename = "circuit:component:delete", rename_all = "camelCase")]
    ComponentDelete { component_id: String },
    #[serde(rename = "circuit:wire:add", rename_all = "camelCase")]
    WireAdd { wire: Wire },
    #[serde(rename = "circuit:wire:delete", rename_all = "camelCase")]
    WireDelete { wire_id: String },
    #[serde(rename = "circuit:annotation:add", rename_all = "camelCase")]
    AnnotationAdd { annotation: Annotation },
    #[serde(rename = "circuit:annotation:delete", rename_all = "camelCase")]
    AnnotationDelete { annotation_id: String },
    #[serde(rename = "circuit:undo")]
    Undo {},
    #[serde(rename = "circuit:redo")]
    Redo {},

    #[serde(rename = "presence:cursor:move", rename_all = "camelCase")]
    CursorMove { position: Position },
    #[serde(rename = "presence:selection:change", rename_all = "camelCase")]
    SelectionChange { component_ids: Vec<String> },

    #[serde(rename = "permission:request:edit")]
    RequestEdit {},
    #[serde(rename = "permission:approve", rename_all = "camelCase")]
    Approve { participant_id: String },
    #[serde(rename = "permission:deny", rename_all = "camelCase")]
    Deny { participant_id: String },
    #[serde(rename = "permission:revoke", rename_all = "camelCase")]
    Revoke { participant_id: String },
    #[serde(rename = "permission:kick", rename_all = "camelCase")]
    Kick { participant_id: String },

    #[serde(rename = "simulation:start")]
    SimulationStart {},
    #[serde(rename = "simulation:stop")]
    SimulationStop {},
    #[serde(rename = "simulation:toggle", rename_all = "camelCase")]
    SimulationToggle { component_id: String },
    #[serde(rename = "simulation:clock:tick", rename_all = "camelCase")]
    SimulationClockTick { component_id: String },
    #[serde(rename = "simulation:step")]
    SimulationStep {},
}

impl ClientMessage {
    /// Whether this message requires edit permission, re-checked fresh on
    /// every message. Undo/redo are exempt: they only replay the user's
    /// own past edits. Presence and permission traffic is gated elsewhere.
    pub fn requires_edit(&self) -> bool {
        matches!(
            self,
            ClientMessage::ComponentAdd { .. }
                | ClientMessage::ComponentMove { .. }
                | ClientMessage::ComponentDelete { .. }
                | ClientMessage::WireAdd { .. }
                | ClientMessage::WireDelete { .. }
                | ClientMessage::AnnotationAdd { .. }
                | ClientMessage::AnnotationDelete { .. }
                | ClientMessage::SimulationStart { .. }
                | ClientMessage::SimulationStop { .. }
                | ClientMessage::SimulationToggle { .. }
                | ClientMessage::SimulationClockTick { .. }
                | ClientMessage::SimulationStep { .. }
        )
    }

    /// Whether this message is restricted to the session's teacher.
    pub fn requires_teacher(&self) -> bool {
        matches!(
            self,
            ClientMessage::Approve { .. }
                | ClientMessage::Deny { .. }
                | ClientMessage::Revoke { .. }
                | ClientMessage::Kick { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Full state push to a newly connected client.
    #[serde(rename = "sync:state", rename_all = "camelCase")]
    SyncState {
        circuit: CircuitState,
        participants: Vec<Participant>,
    },

    #[serde(rename = "circuit:component:added", rename_all = "camelCase")]
    ComponentAdded {
        component: Component,
        user_id: String,
        version: u64,
    },
    #[serde(rename = "circuit:component:moved", rename_all = "camelCase")]
    ComponentMoved {
        component_id: String,
        position: Position,
        user_id: String,
        version: u64,
    },
    #[serde(rename = "circuit:component:deleted", rename_all = "camelCase")]
    ComponentDeleted {
        component_id: String,
        user_id: String,
        version: u64,
    },
    #[serde(rename = "circuit:wire:added", rename_all = "camelCase")]
    WireAdded {
        wire: Wire,
        user_id: String,
        version: u64,
    },
    #[serde(rename = "circuit:wire:deleted", rename_all = "camelCase")]
    WireDeleted {
        wire_id: String,
        user_id: String,
        version: u64,
    },
    #[serde(rename = "circuit:annotation:added", rename_all = "camelCase")]
    AnnotationAdded {
        annotation: Annotation,
        user_id: String,
        version: u64,
    },
    #[serde(rename = "circuit:annotation:deleted", rename_all = "camelCase")]
    AnnotationDeleted {
        annotation_id: String,
        user_id: String,
        version: u64,
    },

    #[serde(rename = "presence:participant:joined", rename_all = "camelCase")]
    ParticipantJoined { participant: Participant },
    #[serde(rename = "presence:participant:left", rename_all = "camelCase")]
    ParticipantLeft { participant_id: String },
    #[serde(rename = "presence:participant:kicked", rename_all = "camelCase")]
    ParticipantKicked {
        participant_id: String,
        display_name: String,
    },
    #[serde(rename = "presence:cursor:moved", rename_all = "camelCase")]
    CursorMoved {
        participant_id: String,
        position: Position,
    },
    #[serde(rename = "presence:selection:changed", rename_all = "camelCase")]
    SelectionChanged {
        participant_id: String,
        component_ids: Vec<String>,
    },

    #[serde(rename = "permission:request:sent", rename_all = "camelCase")]
    RequestSent {
        status: crate::session::EditRequestStatus,
    },
    #[serde(rename = "permission:request:received", rename_all = "camelCase")]
    RequestReceived {
        participant_id: String,
        display_name: String,
    },
    #[serde(rename = "permission:granted", rename_all = "camelCase")]
    PermissionGranted { participant_id: String },
    #[serde(rename = "permission:denied", rename_all = "camelCase")]
    PermissionDenied { participant_id: String },
    #[serde(rename = "permission:revoked", rename_all = "camelCase")]
    PermissionRevoked { participant_id: String },
    /// Sent to the kicked participant just before their connection closes.
    #[serde(rename = "session:kicked", rename_all = "camelCase")]
    SessionKicked { participant_id: String },

    #[serde(rename = "simulation:started", rename_all = "camelCase")]
    SimulationStarted {
        started_by: String,
        wire_states: WireStates,
        pin_states: PinStates,
    },
    #[serde(rename = "simulation:stopped", rename_all = "camelCase")]
    SimulationStopped { stopped_by: String },
    #[serde(rename = "simulation:state:updated", rename_all = "camelCase")]
    SimulationUpdated {
        wire_states: WireStates,
        pin_states: PinStates,
    },
    #[serde(rename = "simulation:error", rename_all = "camelCase")]
    SimulationError { issues: Vec<SimulationIssue> },

    /// Command rejection. Only the offending sender receives it; the
    /// connection stays open.
    #[serde(rename = "error", rename_all = "camelCase")]
    Error { code: String, message: String },
}
