use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use circuitforge_core::circuit::CircuitState;
use circuitforge_core::event::CircuitEvent;
use circuitforge_core::types::Timestamp;

use crate::error::StoreError;

/// A materialized fold of a session's log at one version, so readers
/// replay only the tail instead of the full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub session_code: String,
    pub version: u64,
    pub state: CircuitState,
    pub created_at: Timestamp,
}

/// Append-only per-session event log with snapshots.
///
/// Versions are contiguous from 1. `append` is compare-and-append: the
/// event's version must be exactly one past the session head, otherwise
/// [`StoreError::VersionConflict`] and nothing is written.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: CircuitEvent) -> Result<(), StoreError>;

    /// Events with version strictly greater than `after_version`, in
    /// version order.
    async fn events_since(
        &self,
        session_code: &str,
        after_version: u64,
    ) -> Result<Vec<CircuitEvent>, StoreError>;

    /// Head version for a session; 0 when the log is empty.
    async fn latest_version(&self, session_code: &str) -> Result<u64, StoreError>;

    async fn latest_snapshot(&self, session_code: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Most recent snapshot at or before `version`; `None` when no
    /// snapshot that old exists.
    async fn snapshot_at(
        &self,
        session_code: &str,
        version: u64,
    ) -> Result<Option<Snapshot>, StoreError>;

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<(), StoreError>;

    async fn event_count(&self, session_code: &str) -> Result<usize, StoreError>;

    /// Drop the session's events and snapshots.
    async fn delete_session(&self, session_code: &str) -> Result<(), StoreError>;
}
