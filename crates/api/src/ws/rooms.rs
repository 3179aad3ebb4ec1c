//! Per-session WebSocket rooms.
//!
//! A room holds the live connections for one session plus the state that
//! only exists while the session is live: undo/redo stacks, the running
//! simulation, and pending edit requests. The room (and that state) is
//! dropped when its last connection leaves.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, Mutex, RwLock};

use circuitforge_core::protocol::ServerMessage;
use circuitforge_core::session::EditRequest;
use circuitforge_sim::SimulationEngine;

use crate::services::circuit::UndoStacks;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Live state for one session, owned by its room.
///
/// The stacks mutex doubles as the per-session mutation lock: dispatch
/// holds it across reconstruct-validate-append so commands within a
/// session apply one at a time.
pub struct SessionContext {
    pub stacks: Mutex<UndoStacks>,
    pub simulation: Mutex<Option<SimulationEngine>>,
    pub edit_requests: Mutex<HashMap<String, EditRequest>>,
}

impl SessionContext {
    fn new() -> Self {
        Self {
            stacks: Mutex::new(UndoStacks::new()),
            simulation: Mutex::new(None),
            edit_requests: Mutex::new(HashMap::new()),
        }
    }
}

/// One session's connections, keyed by participant id.
pub struct Room {
    pub session_code: String,
    connections: RwLock<HashMap<String, WsSender>>,
    pub context: SessionContext,
}

impl Room {
    fn new(session_code: &str) -> Self {
        Self {
            session_code: session_code.to_string(),
            connections: RwLock::new(HashMap::new()),
            context: SessionContext::new(),
        }
    }

    async fn add(&self, participant_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        // A reconnect replaces the old sender; the stale forward task ends
        // when its receiver drops.
        self.connections.write().await.insert(participant_id, tx);
        rx
    }

    async fn remove(&self, participant_id: &str) -> usize {
        let mut conns = self.connections.write().await;
        conns.remove(participant_id);
        conns.len()
    }

    /// Broadcast to every connection in the room.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up when their receive loop exits).
    pub async fn broadcast(&self, message: &ServerMessage) {
        let Some(frame) = encode(message) else { return };
        let conns = self.connections.read().await;
        for sender in conns.values() {
            let _ = sender.send(frame.clone());
        }
    }

    /// Broadcast to everyone except one participant, typically the sender
    /// of the originating command.
    pub async fn broadcast_except(&self, skip: &str, message: &ServerMessage) {
        let Some(frame) = encode(message) else { return };
        let conns = self.connections.read().await;
        for (id, sender) in conns.iter() {
            if id != skip {
                let _ = sender.send(frame.clone());
            }
        }
    }

    /// Send to a single participant. Returns false if they have no live
    /// connection.
    pub async fn send_to(&self, participant_id: &str, message: &ServerMessage) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        match self.connections.read().await.get(participant_id) {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// Close a participant's connection with a normal close frame.
    pub async fn close(&self, participant_id: &str) {
        if let Some(sender) = self.connections.write().await.remove(participant_id) {
            let _ = sender.send(Message::Close(None));
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for sender in conns.values() {
            let _ = sender.send(Message::Ping(Bytes::new()));
        }
    }

    async fn shutdown(&self) {
        let mut conns = self.connections.write().await;
        for sender in conns.values() {
            let _ = sender.send(Message::Close(None));
        }
        conns.clear();
    }
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server message");
            None
        }
    }
}

/// All live rooms, keyed by session code.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection, creating the room on first join.
    ///
    /// Returns the room and the receiver half of the connection's message
    /// channel so the caller can forward messages to the WebSocket sink.
    pub async fn join(
        &self,
        session_code: &str,
        participant_id: &str,
    ) -> (Arc<Room>, mpsc::UnboundedReceiver<Message>) {
        let room = {
            let mut rooms = self.rooms.write().await;
            rooms
                .entry(session_code.to_string())
                .or_insert_with(|| Arc::new(Room::new(session_code)))
                .clone()
        };
        let rx = room.add(participant_id.to_string()).await;
        (room, rx)
    }

    /// Remove a connection, dropping the room when it empties.
    ///
    /// Returns true if the room was dropped.
    pub async fn leave(&self, session_code: &str, participant_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(session_code) else {
            return false;
        };
        if room.remove(participant_id).await == 0 {
            rooms.remove(session_code);
            tracing::debug!(session = %session_code, "Room dropped");
            true
        } else {
            false
        }
    }

    pub async fn get(&self, session_code: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(session_code).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Send a Ping frame to every connection in every room.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        for room in rooms {
            room.ping_all().await;
        }
    }

    /// Send a Close frame to every connection, then clear all rooms.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut rooms = self.rooms.write().await;
        let count = rooms.len();
        for room in rooms.values() {
            room.shutdown().await;
        }
        rooms.clear();
        tracing::info!(count, "Closed all WebSocket rooms");
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
