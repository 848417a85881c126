//! In-memory EventLog implementation.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::repository::types::{EventRecord, EventRetention, unix_millis};
use crate::repository::{EventLog, RepositoryError, Result};

/// In-memory implementation of EventLog.
///
/// Keeps the records allowed by its [`EventRetention`] for replay and fans
/// new ones out over a broadcast channel.
pub struct InMemoryEventLog {
    inner: Mutex<LogState>,
    retention: EventRetention,
    tx: broadcast::Sender<EventRecord>,
}

struct LogState {
    records: VecDeque<EventRecord>,
    next_sequence: u64,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::with_retention(EventRetention::default())
    }

    pub fn with_retention(retention: EventRetention) -> Self {
        Self::with_capacity(256, retention)
    }

    /// Creates a log whose live subscribers may lag by up to `capacity` records.
    pub fn with_capacity(capacity: usize, retention: EventRetention) -> Self {
        Self {
            inner: Mutex::new(LogState {
                records: VecDeque::new(),
                next_sequence: 1,
            }),
            retention,
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Appends as if the wall clock read `now`.
    pub(crate) fn append_at(&self, subject: &str, payload: Vec<u8>, now: u64) -> Result<u64> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;

        let record = EventRecord {
            sequence: inner.next_sequence,
            subject: subject.to_string(),
            payload,
            published_at: now,
        };
        inner.next_sequence += 1;
        inner.records.push_back(record.clone());

        let mut evicted = 0;
        while let Some(oldest) = inner.records.front() {
            if !self
                .retention
                .evicts(inner.records.len(), oldest.published_at, now)
            {
                break;
            }
            inner.records.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::trace!("Evicted {} records from the in-memory log", evicted);
        }

        let sequence = record.sequence;
        if self.tx.send(record).is_err() {
            tracing::trace!("No live subscribers for {}", subject);
        }
        Ok(sequence)
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, subject: &str, payload: Vec<u8>) -> Result<u64> {
        self.append_at(subject, payload, unix_millis())
    }

    fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    fn read_from(&self, from: u64) -> Result<Vec<EventRecord>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(inner
            .records
            .iter()
            .filter(|record| record.sequence >= from)
            .cloned()
            .collect())
    }

    fn next_sequence(&self) -> u64 {
        self.inner
            .lock()
            .map(|inner| inner.next_sequence)
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn appends_are_sequenced_and_broadcast() {
        let log = InMemoryEventLog::new();
        let mut rx = log.subscribe();

        assert_eq!(log.append("game.round_started", b"{}".to_vec()).unwrap(), 1);
        assert_eq!(log.append("game.round_reset", b"{}".to_vec()).unwrap(), 2);
        assert_eq!(log.next_sequence(), 3);

        assert_eq!(rx.recv().await.unwrap().subject, "game.round_started");
        assert_eq!(rx.recv().await.unwrap().sequence, 2);

        let tail = log.read_from(2).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].subject, "game.round_reset");
    }

    #[test]
    fn record_cap_drops_oldest_and_keeps_sequencing() {
        let log = InMemoryEventLog::with_retention(EventRetention::new(3, None));
        for _ in 0..10 {
            log.append("game.bit_placed", b"{}".to_vec()).unwrap();
        }

        let sequences: Vec<u64> = log
            .read_from(0)
            .unwrap()
            .iter()
            .map(|record| record.sequence)
            .collect();
        assert_eq!(sequences, [8, 9, 10]);
        assert_eq!(log.next_sequence(), 11);
    }

    #[test]
    fn expired_records_are_dropped_on_append() {
        let log = InMemoryEventLog::with_retention(EventRetention::new(
            100,
            Some(Duration::from_secs(60)),
        ));
        log.append_at("game.player_join", b"{}".to_vec(), 1_000)
            .unwrap();
        log.append_at("game.bit_placed", b"{}".to_vec(), 30_000)
            .unwrap();
        log.append_at("game.round_reset", b"{}".to_vec(), 62_000)
            .unwrap();

        let subjects: Vec<String> = log
            .read_from(0)
            .unwrap()
            .into_iter()
            .map(|record| record.subject)
            .collect();
        assert_eq!(subjects, ["game.bit_placed", "game.round_reset"]);
    }
}
