//! Handlers for the synchronous circuit surface: query, export, import.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use circuitforge_core::circuit::CircuitState;

use crate::error::AppResult;
use crate::services::circuit::CircuitService;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    /// Version of the imported document.
    pub version: u64,
    pub component_count: usize,
    pub wire_count: usize,
    pub annotation_count: usize,
}

/// GET /api/v1/sessions/{code}/circuit
pub async fn get_circuit(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<CircuitState>> {
    state.sessions.get(&code).await?;
    let circuit = state.circuits.state(&code).await?;
    Ok(Json(circuit))
}

/// POST /api/v1/sessions/{code}/export/json
///
/// The export document is the current state verbatim; it round-trips
/// through the import validator.
pub async fn export_json(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<CircuitState>> {
    state.sessions.get(&code).await?;
    let circuit = state.circuits.export(&code).await?;
    Ok(Json(circuit))
}

/// POST /api/v1/sessions/{code}/import
///
/// Schema-validates an exported document and reports what it contains.
/// Nothing is written; the client applies the contents through normal
/// mutation commands so they stay in the event log.
pub async fn import_circuit(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(document): Json<serde_json::Value>,
) -> AppResult<Json<ImportResponse>> {
    state.sessions.get(&code).await?;
    let parsed = CircuitService::validate_import(&document)?;
    Ok(Json(ImportResponse {
        success: true,
        version: parsed.version,
        component_count: parsed.components.len(),
        wire_count: parsed.wires.len(),
        annotation_count: parsed.annotations.len(),
    }))
}
