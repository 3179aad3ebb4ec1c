//! Periodic WebSocket heartbeat.

use std::sync::Arc;
use std::time::Duration;

use crate::ws::rooms::RoomManager;

/// How often to ping every connected client.
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn the heartbeat task. Pings all connections in all rooms on a
/// fixed interval; clients that stop answering are dropped by their
/// receive loops.
pub fn spawn(rooms: Arc<RoomManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        loop {
            interval.tick().await;
            rooms.ping_all().await;
            tracing::trace!("Heartbeat ping sent");
        }
    })
}
