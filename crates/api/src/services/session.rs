//! Session and participant lifecycle.

use std::sync::Arc;

use rand::Rng;

use circuitforge_core::circuit::CircuitState;
use circuitforge_core::error::CoreError;
use circuitforge_core::session::{
    validate_display_name, Participant, Role, Session, CURSOR_COLORS, SESSION_CODE_CHARSET,
    SESSION_CODE_LEN,
};
use circuitforge_store::{EventStore, SessionStore, Snapshot};

use crate::error::AppResult;

/// Attempts before giving up on finding an unused session code.
const CODE_GENERATION_ATTEMPTS: usize = 100;

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    events: Arc<dyn EventStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, events: Arc<dyn EventStore>) -> Self {
        Self { store, events }
    }

    /// Create a session: a fresh share code, the creator's participant id
    /// (handed to whoever should become the teacher), and an empty
    /// version-0 snapshot so reconstruction never starts from nothing.
    pub async fn create(&self) -> AppResult<(Session, String)> {
        let code = self.allocate_code().await?;
        let creator_participant_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now();

        let session = Session {
            code: code.clone(),
            created_at: now,
            last_activity_at: now,
            creator_participant_id: creator_participant_id.clone(),
        };
        self.store.create_session(session.clone()).await?;

        self.events
            .save_snapshot(Snapshot {
                session_code: code.clone(),
                version: 0,
                state: CircuitState::empty(&code),
                created_at: now,
            })
            .await?;

        tracing::info!(session = %code, "Session created");
        Ok((session, creator_participant_id))
    }

    pub async fn get(&self, code: &str) -> AppResult<Session> {
        self.store
            .find_session(code)
            .await?
            .ok_or_else(|| CoreError::not_found("session", code).into())
    }

    pub async fn participants(&self, code: &str) -> AppResult<Vec<Participant>> {
        Ok(self.store.participants(code).await?)
    }

    pub async fn participant(&self, code: &str, participant_id: &str) -> AppResult<Participant> {
        self.store
            .find_participant(code, participant_id)
            .await?
            .ok_or_else(|| CoreError::not_found("participant", participant_id).into())
    }

    /// Join a session.
    ///
    /// Rejoining with a known participant id reactivates the existing
    /// record (same role, color, and permission). A new joiner presenting
    /// the creator id becomes the teacher with edit rights; everyone else
    /// starts as a student without them.
    pub async fn join(
        &self,
        code: &str,
        display_name: &str,
        participant_id: Option<String>,
    ) -> AppResult<Participant> {
        validate_display_name(display_name)?;
        let session = self.get(code).await?;

        if let Some(id) = &participant_id {
            if let Some(mut existing) = self.store.find_participant(code, id).await? {
                existing.is_active = true;
                existing.display_name = display_name.trim().to_string();
                self.store.save_participant(existing.clone()).await?;
                self.store.touch_session(code).await?;
                tracing::info!(session = %code, participant = %id, "Participant rejoined");
                return Ok(existing);
            }
        }

        let id = participant_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let is_teacher = id == session.creator_participant_id;
        let now = chrono::Utc::now();

        let participant = Participant {
            id: id.clone(),
            session_code: code.to_string(),
            display_name: display_name.trim().to_string(),
            role: if is_teacher { Role::Teacher } else { Role::Student },
            can_edit: is_teacher,
            color: self.pick_color(code).await?,
            is_active: true,
            joined_at: now,
            last_seen_at: now,
        };
        self.store.save_participant(participant.clone()).await?;
        self.store.touch_session(code).await?;

        tracing::info!(
            session = %code,
            participant = %id,
            role = ?participant.role,
            "Participant joined"
        );
        Ok(participant)
    }

    pub async fn set_active(
        &self,
        code: &str,
        participant_id: &str,
        active: bool,
    ) -> AppResult<()> {
        Ok(self.store.set_active(code, participant_id, active).await?)
    }

    pub async fn remove_participant(&self, code: &str, participant_id: &str) -> AppResult<bool> {
        Ok(self.store.remove_participant(code, participant_id).await?)
    }

    /// Bump session activity; called on joins and circuit mutations.
    pub async fn touch(&self, code: &str) -> AppResult<()> {
        Ok(self.store.touch_session(code).await?)
    }

    /// Delete sessions idle longer than `max_idle`, cascading to their
    /// event logs, snapshots, and participants. Returns how many were
    /// removed.
    pub async fn cleanup_expired(&self, max_idle: chrono::Duration) -> AppResult<usize> {
        let cutoff = chrono::Utc::now() - max_idle;
        let expired = self.store.sessions_idle_since(cutoff).await?;
        let count = expired.len();
        for session in expired {
            self.events.delete_session(&session.code).await?;
            self.store.delete_session(&session.code).await?;
            tracing::info!(session = %session.code, "Expired idle session");
        }
        Ok(count)
    }

    async fn allocate_code(&self) -> AppResult<String> {
        for _ in 0..CODE_GENERATION_ATTEMPTS {
            let code = generate_code();
            if self.store.find_session(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(CoreError::Internal("could not allocate a unique session code".to_string()).into())
    }

    /// First palette color not in use, falling back to round-robin once
    /// all eight are taken.
    async fn pick_color(&self, code: &str) -> AppResult<String> {
        let participants = self.store.participants(code).await?;
        let taken: Vec<&str> = participants.iter().map(|p| p.color.as_str()).collect();
        let free = CURSOR_COLORS.iter().find(|c| !taken.contains(c));
        let color = match free {
            Some(c) => c,
            None => CURSOR_COLORS[participants.len() % CURSOR_COLORS.len()],
        };
        Ok(color.to_string())
    }
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..SESSION_CODE_LEN)
        .map(|_| {
            let index = rng.random_range(0..SESSION_CODE_CHARSET.len());
            SESSION_CODE_CHARSET[index] as char
        })
        .collect()
}
