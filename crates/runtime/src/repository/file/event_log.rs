//! File-backed EventLog implementation.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use tokio::sync::broadcast;

use super::FileRepository;
use crate::repository::types::{EventRecord, EventRetention, unix_millis};
use crate::repository::{EventLog, RepositoryError, Result};

/// Default file name of the event stream.
pub const EVENTS_FILE: &str = "events.log";

/// Evicted records tolerated on disk before the file is compacted, unless
/// they outnumber the live ones.
const COMPACT_MIN_STALE: usize = 1024;

/// Append-only event log persisted through a [`FileRepository`].
///
/// Every append is flushed before subscribers are notified, so a record a
/// subscriber has seen is also readable from disk. Records evicted by the
/// [`EventRetention`] stay on disk until enough of them pile up, then the
/// file is rewritten without them.
pub struct FileEventLog {
    inner: Mutex<LogState>,
    retention: EventRetention,
    tx: broadcast::Sender<EventRecord>,
}

struct LogState {
    repo: FileRepository<EventRecord>,
    /// Live records, oldest first.
    index: VecDeque<IndexEntry>,
    /// Evicted records still in the file ahead of the first live one.
    stale: usize,
    next_sequence: u64,
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    offset: u64,
    sequence: u64,
    published_at: u64,
}

impl FileEventLog {
    /// Opens `events.log` under `base_dir` with the default retention.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(base_dir, EventRetention::default())
    }

    /// Opens `events.log` under `base_dir`, creating it if needed.
    pub fn open_with(base_dir: impl AsRef<Path>, retention: EventRetention) -> Result<Self> {
        Self::open_file(base_dir, EVENTS_FILE, 256, retention)
    }

    /// Opens a named log. Existing records are scanned to resume the
    /// sequence counter, and the retention is applied right away.
    pub fn open_file(
        base_dir: impl AsRef<Path>,
        filename: &str,
        capacity: usize,
        retention: EventRetention,
    ) -> Result<Self> {
        let repo = FileRepository::<EventRecord>::open_or_create(base_dir, filename)?;
        let index: VecDeque<IndexEntry> = repo
            .read_entries_from(0)?
            .into_iter()
            .map(|(offset, record)| IndexEntry {
                offset,
                sequence: record.sequence,
                published_at: record.published_at,
            })
            .collect();
        let next_sequence = index.back().map_or(1, |entry| entry.sequence + 1);

        let mut state = LogState {
            repo,
            index,
            stale: 0,
            next_sequence,
        };
        if state.evict(&retention, unix_millis()) > 0 {
            state.compact()?;
        }

        tracing::info!(
            "Event log {} ready at sequence {} ({} records kept)",
            state.repo.path().display(),
            state.next_sequence,
            state.index.len()
        );

        Ok(Self {
            inner: Mutex::new(state),
            retention,
            tx: broadcast::channel(capacity.max(1)).0,
        })
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
        let offset = inner.repo.append(&record)?;
        inner.repo.flush()?;
        inner.next_sequence += 1;
        inner.index.push_back(IndexEntry {
            offset,
            sequence: record.sequence,
            published_at: now,
        });

        inner.evict(&self.retention, now);
        if inner.stale >= COMPACT_MIN_STALE.max(inner.index.len()) {
            // Retried on a later append.
            if let Err(err) = inner.compact() {
                tracing::warn!("Failed to compact {}: {}", inner.repo.name(), err);
            }
        }

        let sequence = record.sequence;
        if self.tx.send(record).is_err() {
            tracing::trace!("No live subscribers for {}", subject);
        }
        Ok(sequence)
    }

    /// Bytes currently occupied on disk.
    pub fn size(&self) -> u64 {
        self.inner.lock().map(|inner| inner.repo.size()).unwrap_or(0)
    }
}

impl LogState {
    /// Drops index entries the retention no longer allows. Returns how many.
    fn evict(&mut self, retention: &EventRetention, now: u64) -> usize {
        let mut evicted = 0;
        while let Some(oldest) = self.index.front() {
            if !retention.evicts(self.index.len(), oldest.published_at, now) {
                break;
            }
            self.index.pop_front();
            evicted += 1;
        }
        self.stale += evicted;
        evicted
    }

    /// Rewrites the file without the evicted records.
    fn compact(&mut self) -> Result<()> {
        let start = self
            .index
            .front()
            .map_or(self.repo.size(), |entry| entry.offset);
        self.repo.retain_from(start)?;
        for entry in &mut self.index {
            entry.offset -= start;
        }
        self.stale = 0;
        Ok(())
    }
}

impl EventLog for FileEventLog {
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

        let first = inner.index.partition_point(|entry| entry.sequence < from);
        let Some(start) = inner.index.get(first) else {
            return Ok(Vec::new());
        };
        Ok(inner
            .repo
            .read_entries_from(start.offset)?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    fn next_sequence(&self) -> u64 {
        self.inner
            .lock()
            .map(|inner| inner.next_sequence)
            .unwrap_or(1)
    }
}
