use async_trait::async_trait;

use circuitforge_core::session::{Participant, Session};
use circuitforge_core::types::Timestamp;

use crate::error::StoreError;

/// Session and participant records.
///
/// Participants are scoped to their session; deleting a session cascades
/// to its participants.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: Session) -> Result<(), StoreError>;

    async fn find_session(&self, code: &str) -> Result<Option<Session>, StoreError>;

    /// Bump the session's last-activity timestamp. Unknown codes are
    /// ignored (the session may have been cleaned up mid-request).
    async fn touch_session(&self, code: &str) -> Result<(), StoreError>;

    /// Sessions whose last activity is at or before `cutoff`.
    async fn sessions_idle_since(&self, cutoff: Timestamp) -> Result<Vec<Session>, StoreError>;

    /// Remove the session and its participants. Returns whether a record
    /// existed.
    async fn delete_session(&self, code: &str) -> Result<bool, StoreError>;

    /// Insert or replace a participant record.
    async fn save_participant(&self, participant: Participant) -> Result<(), StoreError>;

    async fn find_participant(
        &self,
        code: &str,
        participant_id: &str,
    ) -> Result<Option<Participant>, StoreError>;

    /// All participants of a session, in join order.
    async fn participants(&self, code: &str) -> Result<Vec<Participant>, StoreError>;

    /// Set the connected flag and bump `last_seen_at`.
    async fn set_active(
        &self,
        code: &str,
        participant_id: &str,
        active: bool,
    ) -> Result<(), StoreError>;

    async fn set_can_edit(
        &self,
        code: &str,
        participant_id: &str,
        can_edit: bool,
    ) -> Result<(), StoreError>;

    /// Returns whether a record existed.
    async fn remove_participant(
        &self,
        code: &str,
        participant_id: &str,
    ) -> Result<bool, StoreError>;
}
