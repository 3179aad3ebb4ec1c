pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws/{code}/{participant_id}          WebSocket (collaboration)
///
/// /sessions                            create (POST)
/// /sessions/{code}                     session info + participants (GET)
/// /sessions/{code}/join                join or rejoin (POST)
///
/// /sessions/{code}/circuit             current reconstructed state (GET)
/// /sessions/{code}/export/json         export as portable document (POST)
/// /sessions/{code}/import              validate an exported document (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint.
        .route("/ws/{code}/{participant_id}", get(ws::ws_handler))
        // Session lifecycle.
        .route("/sessions", post(handlers::sessions::create))
        .route("/sessions/{code}", get(handlers::sessions::get))
        .route("/sessions/{code}/join", post(handlers::sessions::join))
        // Synchronous circuit surface.
        .route(
            "/sessions/{code}/circuit",
            get(handlers::circuits::get_circuit),
        )
        .route(
            "/sessions/{code}/export/json",
            post(handlers::circuits::export_json),
        )
        .route(
            "/sessions/{code}/import",
            post(handlers::circuits::import_circuit),
        )
}
