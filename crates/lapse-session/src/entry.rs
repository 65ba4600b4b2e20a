//! Stored session record.

use serde::{Deserialize, Serialize};

/// Caller-defined session payload.
///
/// Replaced wholesale on update, never merged.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A session's payload plus its freshness timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Session data.
    pub payload: Payload,

    /// When the session was created (epoch seconds).
    pub created_at: i64,

    /// When the session was last updated (epoch seconds).
    pub last_touched: i64,
}

impl SessionEntry {
    /// Create an entry with an empty payload, touched at `now`.
    pub(crate) fn new(now: i64) -> Self {
        Self {
            payload: Payload::new(),
            created_at: now,
            last_touched: now,
        }
    }

    /// Replace the payload and refresh the timestamp.
    ///
    /// The timestamp never moves backwards, even if the clock does.
    pub(crate) fn touch(&mut self, payload: Payload, now: i64) {
        self.payload = payload;
        self.last_touched = self.last_touched.max(now);
    }

    /// Seconds since the last touch.
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.last_touched)
    }

    /// Whether the entry is older than `threshold_secs` at `now`.
    pub fn is_stale(&self, now: i64, threshold_secs: i64) -> bool {
        self.age(now) > threshold_secs
    }
}
