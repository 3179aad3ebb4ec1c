use thiserror::Error;

/// Domain-level error taxonomy shared across crates.
///
/// Validation errors carry a stable machine-readable code (for example
/// `DUPLICATE_WIRE`) alongside the human-readable message; clients branch
/// on the code, never on the message text.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity lookup failed.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A request was well-formed but semantically invalid.
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },

    /// The operation raced with a concurrent writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The participant is known but lacks permission for the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unexpected internal failure. The message is logged server-side and
    /// never sent to clients verbatim.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }
}
