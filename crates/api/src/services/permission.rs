//! Edit-permission checks and grants.
//!
//! Permission lives on the participant record so it survives reconnects;
//! checks read the record fresh every time rather than caching, so a
//! revocation takes effect on the offender's very next message.

use std::sync::Arc;

use circuitforge_core::error::CoreError;
use circuitforge_core::session::{Participant, Role};
use circuitforge_store::SessionStore;

use crate::error::AppResult;

pub struct PermissionService {
    store: Arc<dyn SessionStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Fail with `FORBIDDEN` unless the participant currently holds edit
    /// permission.
    pub async fn require_edit(&self, code: &str, participant_id: &str) -> AppResult<()> {
        let participant = self.lookup(code, participant_id).await?;
        if participant.can_edit {
            Ok(())
        } else {
            Err(CoreError::Forbidden("You do not have edit permission".to_string()).into())
        }
    }

    /// Fail with `FORBIDDEN` unless the participant is the session's
    /// teacher. Returns the teacher's record.
    pub async fn require_teacher(
        &self,
        code: &str,
        participant_id: &str,
    ) -> AppResult<Participant> {
        let participant = self.lookup(code, participant_id).await?;
        if participant.role == Role::Teacher {
            Ok(participant)
        } else {
            Err(CoreError::Forbidden(
                "Only the teacher can manage permissions".to_string(),
            )
            .into())
        }
    }

    pub async fn grant(&self, code: &str, participant_id: &str) -> AppResult<()> {
        // Ensure the record exists before flipping the flag.
        self.lookup(code, participant_id).await?;
        Ok(self.store.set_can_edit(code, participant_id, true).await?)
    }

    pub async fn revoke(&self, code: &str, participant_id: &str) -> AppResult<()> {
        self.lookup(code, participant_id).await?;
        Ok(self.store.set_can_edit(code, participant_id, false).await?)
    }

    async fn lookup(&self, code: &str, participant_id: &str) -> AppResult<Participant> {
        self.store
            .find_participant(code, participant_id)
            .await?
            .ok_or_else(|| CoreError::not_found("participant", participant_id).into())
    }
}
