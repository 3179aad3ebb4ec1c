use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Compare-and-append failed: another writer advanced the log first.
    #[error("version conflict in session {session_code}: expected {expected}, got {got}")]
    VersionConflict {
        session_code: String,
        expected: u64,
        got: u64,
    },

    /// Backend failure (connectivity, corruption). The in-memory store
    /// uses this for contract violations such as writing a participant
    /// into a session that does not exist.
    #[error("storage backend error: {0}")]
    Backend(String),
}
