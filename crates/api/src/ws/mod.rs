//! Real-time collaboration over WebSocket.

pub mod dispatch;
pub mod handler;
pub mod heartbeat;
pub mod rooms;

pub use handler::ws_handler;
pub use rooms::{Room, RoomManager, SessionContext, WsSender};
