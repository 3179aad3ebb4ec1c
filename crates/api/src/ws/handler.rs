//! WebSocket upgrade and per-connection lifecycle.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use circuitforge_core::protocol::{ClientMessage, ServerMessage};

use crate::state::AppState;
use crate::ws::dispatch;

/// Session not found, sent as an application close code.
const CLOSE_UNKNOWN_SESSION: u16 = 4004;
/// Participant not found (join over HTTP first).
const CLOSE_UNKNOWN_PARTICIPANT: u16 = 4001;

/// HTTP handler that upgrades `GET /api/v1/ws/{code}/{participant_id}`.
///
/// Identity is checked after the upgrade so the client gets a close code
/// it can distinguish, rather than an opaque failed handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((code, participant_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, code, participant_id))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Validates the session and participant, joins the room, pushes the
/// initial state sync, then:
///   1. Spawns a sender task that forwards room-channel messages to the sink.
///   2. Processes inbound messages on the current task.
///   3. Cleans up (room membership, presence) on disconnect.
async fn handle_socket(mut socket: WebSocket, state: AppState, code: String, participant_id: String) {
    if state.sessions.get(&code).await.is_err() {
        close_with(&mut socket, CLOSE_UNKNOWN_SESSION, "Session not found").await;
        return;
    }
    let participant = match state.sessions.participant(&code, &participant_id).await {
        Ok(p) => p,
        Err(_) => {
            close_with(&mut socket, CLOSE_UNKNOWN_PARTICIPANT, "Participant not found").await;
            return;
        }
    };
    tracing::info!(session = %code, participant = %participant_id, "WebSocket connected");

    let (room, mut rx) = state.rooms.join(&code, &participant_id).await;
    let _ = state.sessions.set_active(&code, &participant_id, true).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_id = participant_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let is_close = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(participant = %sender_id, "WebSocket sink closed");
                break;
            }
            if is_close {
                break;
            }
        }
    });

    // Initial sync to the new connection, then announce them to the room.
    match initial_sync(&state, &code).await {
        Ok(sync) => {
            room.send_to(&participant_id, &sync).await;
        }
        Err(e) => {
            tracing::error!(session = %code, error = %e, "Failed to build initial sync");
        }
    }
    room.broadcast_except(
        &participant_id,
        &ServerMessage::ParticipantJoined {
            participant: participant.clone(),
        },
    )
    .await;

    // Receiver loop: parse and dispatch inbound commands.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(participant = %participant_id, "Pong received");
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if let Err(e) = dispatch::handle(&state, &room, &participant_id, msg).await {
                        let (_, error_code, message) = e.parts();
                        room.send_to(
                            &participant_id,
                            &ServerMessage::Error {
                                code: error_code.to_string(),
                                message,
                            },
                        )
                        .await;
                    }
                }
                Err(e) => {
                    tracing::debug!(participant = %participant_id, error = %e, "Unparseable message");
                    room.send_to(
                        &participant_id,
                        &ServerMessage::Error {
                            code: "BAD_MESSAGE".to_string(),
                            message: "Could not parse message".to_string(),
                        },
                    )
                    .await;
                }
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(participant = %participant_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: leave the room, mark inactive, tell the others.
    send_task.abort();
    state.rooms.leave(&code, &participant_id).await;
    let _ = state.sessions.set_active(&code, &participant_id, false).await;
    room.broadcast(&ServerMessage::ParticipantLeft {
        participant_id: participant_id.clone(),
    })
    .await;
    tracing::info!(session = %code, participant = %participant_id, "WebSocket disconnected");
}

async fn initial_sync(state: &AppState, code: &str) -> crate::error::AppResult<ServerMessage> {
    let circuit = state.circuits.state(code).await?;
    let participants = state.sessions.participants(code).await?;
    Ok(ServerMessage::SyncState {
        circuit,
        participants,
    })
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}
