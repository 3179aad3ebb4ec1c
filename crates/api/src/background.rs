//! Background maintenance tasks.

use std::sync::Arc;

use crate::services::session::SessionService;

/// How often the expiry sweep runs.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Spawn the periodic session-expiry sweep. Sessions idle longer than
/// `max_idle_hours` are deleted along with their event logs.
pub fn spawn_session_cleanup(
    sessions: Arc<SessionService>,
    max_idle_hours: i64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match sessions
                .cleanup_expired(chrono::Duration::hours(max_idle_hours))
                .await
            {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Expired idle sessions"),
                Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
            }
        }
    })
}
