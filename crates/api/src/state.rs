use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::circuit::CircuitService;
use crate::services::permission::PermissionService;
use crate::services::session::SessionService;
use crate::ws::rooms::RoomManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Session and participant lifecycle.
    pub sessions: Arc<SessionService>,
    /// Event-sourced circuit mutations and reconstruction.
    pub circuits: Arc<CircuitService>,
    /// Edit-permission checks and grants.
    pub permissions: Arc<PermissionService>,
    /// Per-session WebSocket rooms.
    pub rooms: Arc<RoomManager>,
}
