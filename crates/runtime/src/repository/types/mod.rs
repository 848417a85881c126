//! Records exchanged with snapshot stores and event logs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A value stored under a key, together with its revision.
///
/// Revisions start at 1 and grow by one on every write to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub revision: u64,
    pub value: Vec<u8>,
}

/// One entry of a subject-addressed event log.
///
/// `payload` is opaque to the log; the distribution layer stores JSON
/// envelopes in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    pub subject: String,
    pub payload: Vec<u8>,
    /// Milliseconds since the Unix epoch at append time.
    pub published_at: u64,
}

/// How much history an event log keeps.
///
/// Both bounds are enforced on append; the oldest records go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRetention {
    pub max_records: usize,
    /// `None` keeps records regardless of age.
    pub max_age: Option<Duration>,
}

impl EventRetention {
    pub const DEFAULT_MAX_RECORDS: usize = 100_000;
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new(max_records: usize, max_age: Option<Duration>) -> Self {
        Self {
            max_records: max_records.max(1),
            max_age,
        }
    }

    /// True once a record appended at `published_at` is older than
    /// `max_age` at `now`.
    pub fn is_expired(&self, published_at: u64, now: u64) -> bool {
        self.max_age.is_some_and(|age| {
            let age = u64::try_from(age.as_millis()).unwrap_or(u64::MAX);
            now.saturating_sub(published_at) > age
        })
    }

    /// True if the oldest of `len` records, appended at `published_at`,
    /// must go.
    pub(crate) fn evicts(&self, len: usize, published_at: u64, now: u64) -> bool {
        len > self.max_records || self.is_expired(published_at, now)
    }
}

impl Default for EventRetention {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RECORDS, Some(Self::DEFAULT_MAX_AGE))
    }
}

/// Wall-clock milliseconds used to stamp appended records.
pub(crate) fn unix_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_follows_max_age() {
        let retention = EventRetention::new(10, Some(Duration::from_secs(60)));
        assert!(!retention.is_expired(1_000, 61_000));
        assert!(retention.is_expired(1_000, 61_001));
        assert!(!retention.is_expired(5_000, 1_000));

        let forever = EventRetention::new(10, None);
        assert!(!forever.is_expired(0, u64::MAX));
    }

    #[test]
    fn record_cap_evicts_the_overflow() {
        let retention = EventRetention::new(2, None);
        assert!(!retention.evicts(2, 0, 0));
        assert!(retention.evicts(3, 0, 0));
    }
}
