//! Sessions, participants, and the permission model.
//!
//! A session is identified by a 6-character share code. The first joiner
//! holding the creator id becomes the teacher (sole permission manager);
//! everyone else joins as a student without edit rights until approved.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Length of the shareable session code.
pub const SESSION_CODE_LEN: usize = 6;

/// Alphabet for session codes; uppercase and digits only so codes survive
/// being read aloud.
pub const SESSION_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Cursor colors assigned round-robin to joining participants.
pub const CURSOR_COLORS: [&str; 8] = [
    "#E63946", "#457B9D", "#2A9D8F", "#E9C46A", "#9B5DE5", "#F15BB5", "#00B4D8", "#FB8500",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub code: String,
    pub created_at: Timestamp,
    /// Bumped on join and on every mutation; drives idle-session cleanup.
    pub last_activity_at: Timestamp,
    /// Participant id issued at creation; whoever joins with it first
    /// becomes the teacher.
    pub creator_participant_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub session_code: String,
    pub display_name: String,
    pub role: Role,
    pub can_edit: bool,
    pub color: String,
    pub is_active: bool,
    pub joined_at: Timestamp,
    pub last_seen_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditRequestStatus {
    Pending,
    Approved,
    Denied,
}

/// A student's pending request for edit permission. Lives in the room
/// context only; dropped when the room empties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub participant_id: String,
    pub requested_at: Timestamp,
    pub status: EditRequestStatus,
}

/// Display names are 3-20 characters, alphanumeric and spaces, and not
/// all whitespace.
pub fn validate_display_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.len() < 3 || trimmed.len() > 20 {
        return Err(CoreError::validation(
            "INVALID_DISPLAY_NAME",
            "Display name must be 3-20 characters",
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ')
    {
        return Err(CoreError::validation(
            "INVALID_DISPLAY_NAME",
            "Display name may contain only letters, digits, and spaces",
        ));
    }
    Ok(())
}

pub fn is_valid_session_code(code: &str) -> bool {
    code.len() == SESSION_CODE_LEN
        && code
            .bytes()
            .all(|b| SESSION_CODE_CHARSET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn accepts_simple_names() {
        assert!(validate_display_name("Ada").is_ok());
        assert!(validate_display_name("Grace Hopper 2").is_ok());
        assert!(validate_display_name("  Ada  ").is_ok()); // trimmed
    }

    #[test]
    fn rejects_bad_lengths_and_charsets() {
        assert_matches!(
            validate_display_name("Al"),
            Err(CoreError::Validation { code: "INVALID_DISPLAY_NAME", .. })
        );
        assert_matches!(
            validate_display_name("x".repeat(21).as_str()),
            Err(CoreError::Validation { code: "INVALID_DISPLAY_NAME", .. })
        );
        assert_matches!(
            validate_display_name("Ada<script>"),
            Err(CoreError::Validation { code: "INVALID_DISPLAY_NAME", .. })
        );
        assert_matches!(
            validate_display_name("   "),
            Err(CoreError::Validation { code: "INVALID_DISPLAY_NAME", .. })
        );
    }

    #[test]
    fn session_code_shape() {
        assert!(is_valid_session_code("ABC123"));
        assert!(!is_valid_session_code("abc123"));
        assert!(!is_valid_session_code("ABC12"));
        assert!(!is_valid_session_code("ABC12!"));
    }
}
