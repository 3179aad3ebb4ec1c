//! Append-only mutation events.
//!
//! Every change to a circuit is recorded as one immutable `CircuitEvent`
//! with a per-session version that increases by exactly 1 per event. The
//! payload is a closed tagged union; adding a kind is a schema change.

use serde::{Deserialize, Serialize};

use crate::circuit::{Annotation, Component, Position, Wire};
use crate::types::Timestamp;

/// One entry in a session's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitEvent {
    pub session_code: String,
    pub version: u64,
    /// Participant that issued the mutation.
    pub user_id: String,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// The seven mutation kinds, serialized as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    #[serde(rename = "COMPONENT_ADDED", rename_all = "camelCase")]
    ComponentAdded { component: Component },
    #[serde(rename = "COMPONENT_MOVED", rename_all = "camelCase")]
    ComponentMoved {
        component_id: String,
        position: Position,
    },
    #[serde(rename = "COMPONENT_DELETED", rename_all = "camelCase")]
    ComponentDeleted { component_id: String },
    #[serde(rename = "WIRE_ADDED", rename_all = "camelCase")]
    WireAdded { wire: Wire },
    #[serde(rename = "WIRE_DELETED", rename_all = "camelCase")]
    WireDeleted { wire_id: String },
    #[serde(rename = "ANNOTATION_ADDED", rename_all = "camelCase")]
    AnnotationAdded { annotation: Annotation },
    #[serde(rename = "ANNOTATION_DELETED", rename_all = "camelCase")]
    AnnotationDeleted { annotation_id: String },
}

impl EventPayload {
    /// Wire-format tag, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::ComponentAdded { .. } => "COMPONENT_ADDED",
            EventPayload::ComponentMoved { .. } => "COMPONENT_MOVED",
            EventPayload::ComponentDeleted { .. } => "COMPONENT_DELETED",
            EventPayload::WireAdded { .. } => "WIRE_ADDED",
            EventPayload::WireDeleted { .. } => "WIRE_DELETED",
            EventPayload::AnnotationAdded { .. } => "ANNOTATION_ADDED",
            EventPayload::AnnotationDeleted { .. } => "ANNOTATION_DELETED",
        }
    }
}
