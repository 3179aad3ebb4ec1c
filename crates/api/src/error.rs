use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use circuitforge_core::error::CoreError;
use circuitforge_store::StoreError;

/// Application-level error type for HTTP handlers and the WebSocket
/// dispatcher.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for storage
/// errors. Implements [`IntoResponse`] for HTTP; the WebSocket layer uses
/// [`AppError::parts`] to build `error` frames with the same codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status, machine code, and client-safe message.
    ///
    /// Internal details are logged here and replaced with a generic
    /// message; everything else passes through verbatim.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation { code, message } => {
                    (StatusCode::BAD_REQUEST, code, message.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::Store(store) => match store {
                StoreError::VersionConflict { session_code, .. } => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Session {session_code} was modified concurrently"),
                ),
                StoreError::Backend(msg) => {
                    tracing::error!(error = %msg, "Storage backend error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
