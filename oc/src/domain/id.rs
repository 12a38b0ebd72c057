//! Identifier and timestamp helpers

/// Generate a new opaque identifier (time-ordered UUID v7)
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Current Unix time in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
