//! HTTP + WebSocket server for the collaborative circuit editor.
//!
//! REST surface for session lifecycle and circuit query/export/import;
//! WebSocket rooms for real-time editing, presence, permissions, and
//! simulation control.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;

pub use error::{AppError, AppResult};
