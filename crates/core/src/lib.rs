//! Domain model for the collaborative circuit editor: circuit state, the
//! append-only mutation events and the pure fold that reconstructs state
//! from them, sessions and participants, the component catalog, wire
//! validation rules, and the WebSocket message protocol.
//!
//! This crate has no I/O and no internal dependencies; everything here is
//! deterministic and directly testable.

pub mod catalog;
pub mod circuit;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod signal;
pub mod types;
pub mod validation;

pub use error::CoreError;
