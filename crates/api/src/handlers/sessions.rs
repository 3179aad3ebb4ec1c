//! Handlers for the `/sessions` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use circuitforge_core::session::{Participant, Session};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    /// Shown to other participants; character rules are checked in the
    /// session service on top of this length bound.
    #[validate(length(min = 3, max = 20))]
    pub display_name: String,
    /// Present on rejoin; a matching record is reactivated as-is.
    pub participant_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session: Session,
    /// Hand this to the client that should become the teacher; presenting
    /// it on join claims the teacher role.
    pub creator_participant_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session: Session,
    pub participants: Vec<Participant>,
}

/// POST /api/v1/sessions
pub async fn create(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<CreateSessionResponse>)> {
    let (session, creator_participant_id) = state.sessions.create().await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session,
            creator_participant_id,
        }),
    ))
}

/// GET /api/v1/sessions/{code}
pub async fn get(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.sessions.get(&code).await?;
    let participants = state.sessions.participants(&code).await?;
    Ok(Json(SessionResponse {
        session,
        participants,
    }))
}

/// POST /api/v1/sessions/{code}/join
pub async fn join(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(input): Json<JoinSessionRequest>,
) -> AppResult<Json<Participant>> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let participant = state
        .sessions
        .join(&code, &input.display_name, input.participant_id)
        .await?;
    Ok(Json(participant))
}
