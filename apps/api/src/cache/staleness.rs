use chrono::{DateTime, Duration, Utc};

/// A record is fresh while its age is within the expiry window, boundary included.
///
/// A `written_at` in the future (clock skew between writers) has negative age
/// and counts as fresh.
pub fn is_fresh(written_at: DateTime<Utc>, now: DateTime<Utc>, expiry_window: Duration) -> bool {
    now - written_at <= expiry_window
}
