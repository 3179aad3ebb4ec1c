//! In-memory reference implementations of the storage contracts.
//!
//! Per-session data lives behind a single `RwLock`-guarded map; the write
//! lock makes `append` atomic, which is what gives compare-and-append its
//! guarantee here.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use circuitforge_core::event::CircuitEvent;
use circuitforge_core::session::{Participant, Session};
use circuitforge_core::types::Timestamp;

use crate::error::StoreError;
use crate::event_store::{EventStore, Snapshot};
use crate::session_store::SessionStore;

// ---------------------------------------------------------------------------
// Event store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SessionLog {
    events: Vec<CircuitEvent>,
    snapshots: Vec<Snapshot>,
}

impl SessionLog {
    fn head(&self) -> u64 {
        self.events.last().map(|e| e.version).unwrap_or(0)
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    logs: RwLock<HashMap<String, SessionLog>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: CircuitEvent) -> Result<(), StoreError> {
        let mut logs = self.logs.write().await;
        let log = logs.entry(event.session_code.clone()).or_default();
        let expected = log.head() + 1;
        if event.version != expected {
            return Err(StoreError::VersionConflict {
                session_code: event.session_code,
                expected,
                got: event.version,
            });
        }
        log.events.push(event);
        Ok(())
    }

    async fn events_since(
        &self,
        session_code: &str,
        after_version: u64,
    ) -> Result<Vec<CircuitEvent>, StoreError> {
        let logs = self.logs.read().await;
        Ok(logs
            .get(session_code)
            .map(|log| {
                log.events
                    .iter()
                    .filter(|e| e.version > after_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_version(&self, session_code: &str) -> Result<u64, StoreError> {
        let logs = self.logs.read().await;
        Ok(logs.get(session_code).map(|log| log.head()).unwrap_or(0))
    }

    async fn latest_snapshot(&self, session_code: &str) -> Result<Option<Snapshot>, StoreError> {
        let logs = self.logs.read().await;
        Ok(logs.get(session_code).and_then(|log| {
            log.snapshots
                .iter()
                .max_by_key(|s| s.version)
                .cloned()
        }))
    }

    async fn snapshot_at(
        &self,
        session_code: &str,
        version: u64,
    ) -> Result<Option<Snapshot>, StoreError> {
        let logs = self.logs.read().await;
        Ok(logs.get(session_code).and_then(|log| {
            log.snapshots
                .iter()
                .filter(|s| s.version <= version)
                .max_by_key(|s| s.version)
                .cloned()
        }))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let mut logs = self.logs.write().await;
        let log = logs.entry(snapshot.session_code.clone()).or_default();
        // Re-snapshotting a version replaces the earlier snapshot.
        log.snapshots.retain(|s| s.version != snapshot.version);
        log.snapshots.push(snapshot);
        Ok(())
    }

    async fn event_count(&self, session_code: &str) -> Result<usize, StoreError> {
        let logs = self.logs.read().await;
        Ok(logs.get(session_code).map(|log| log.events.len()).unwrap_or(0))
    }

    async fn delete_session(&self, session_code: &str) -> Result<(), StoreError> {
        self.logs.write().await.remove(session_code);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

struct SessionRecord {
    session: Session,
    participants: Vec<Participant>,
}

#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: Session) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&session.code) {
            return Err(StoreError::Backend(format!(
                "session {} already exists",
                session.code
            )));
        }
        records.insert(
            session.code.clone(),
            SessionRecord {
                session,
                participants: Vec::new(),
            },
        );
        Ok(())
    }

    async fn find_session(&self, code: &str) -> Result<Option<Session>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(code).map(|r| r.session.clone()))
    }

    async fn touch_session(&self, code: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(code) {
            record.session.last_activity_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn sessions_idle_since(&self, cutoff: Timestamp) -> Result<Vec<Session>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.session.last_activity_at <= cutoff)
            .map(|r| r.session.clone())
            .collect())
    }

    async fn delete_session(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(code).is_some())
    }

    async fn save_participant(&self, participant: Participant) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&participant.session_code).ok_or_else(|| {
            StoreError::Backend(format!(
                "session {} does not exist",
                participant.session_code
            ))
        })?;
        match record
            .participants
            .iter_mut()
            .find(|p| p.id == participant.id)
        {
            Some(existing) => *existing = participant,
            None => record.participants.push(participant),
        }
        Ok(())
    }

    async fn find_participant(
        &self,
        code: &str,
        participant_id: &str,
    ) -> Result<Option<Participant>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(code).and_then(|r| {
            r.participants
                .iter()
                .find(|p| p.id == participant_id)
                .cloned()
        }))
    }

    async fn participants(&self, code: &str) -> Result<Vec<Participant>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(code)
            .map(|r| r.participants.clone())
            .unwrap_or_default())
    }

    async fn set_active(
        &self,
        code: &str,
        participant_id: &str,
        active: bool,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(code) {
            if let Some(p) = record
                .participants
                .iter_mut()
                .find(|p| p.id == participant_id)
            {
                p.is_active = active;
                p.last_seen_at = chrono::Utc::now();
            }
        }
        Ok(())
    }

    async fn set_can_edit(
        &self,
        code: &str,
        participant_id: &str,
        can_edit: bool,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(code) {
            if let Some(p) = record
                .participants
                .iter_mut()
                .find(|p| p.id == participant_id)
            {
                p.can_edit = can_edit;
            }
        }
        Ok(())
    }

    async fn remove_participant(
        &self,
        code: &str,
        participant_id: &str,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(code) {
            let before = record.participants.len();
            record.participants.retain(|p| p.id != participant_id);
            return Ok(record.participants.len() < before);
        }
        Ok(false)
    }
}
