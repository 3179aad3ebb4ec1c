/// UTC timestamp used by all models and events.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current wall-clock time.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}
