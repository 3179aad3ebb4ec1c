//! Storage contracts for the collaboration backend.
//!
//! Durable storage is abstract: an append-only event log with snapshots
//! ([`EventStore`]) and a session/participant record store
//! ([`SessionStore`]). The in-memory implementations here back the server
//! and the test suites; a database-backed implementation plugs in behind
//! the same traits.

pub mod error;
pub mod event_store;
pub mod memory;
pub mod session_store;

pub use error::StoreError;
pub use event_store::{EventStore, Snapshot};
pub use memory::{MemoryEventStore, MemorySessionStore};
pub use session_store::SessionStore;
