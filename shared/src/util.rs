//! Small shared utilities

/// Current wall-clock time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
