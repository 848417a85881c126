//! Repository contracts for the replicated snapshot store and event log.

use tokio::sync::{broadcast, watch};

use super::Result;
use super::types::{EventRecord, KvEntry};

/// Durable key-value store holding serialized snapshots.
///
/// Implementations keep a revision per key and notify watchers after every
/// successful write.
pub trait SnapshotStore: Send + Sync {
    /// Writes `value` under `key` and returns the new revision.
    fn put(&self, key: &str, value: Vec<u8>) -> Result<u64>;

    /// Reads the latest entry for `key`.
    fn get(&self, key: &str) -> Result<Option<KvEntry>>;

    /// Watches `key` for future writes.
    ///
    /// The returned receiver has already observed the current value, so
    /// `changed()` only resolves on updates made after this call.
    fn watch(&self, key: &str) -> Result<watch::Receiver<Option<KvEntry>>>;
}

/// Append-only, subject-addressed event log.
pub trait EventLog: Send + Sync {
    /// Appends a record and returns its sequence number.
    fn append(&self, subject: &str, payload: Vec<u8>) -> Result<u64>;

    /// Subscribes to records appended after this call.
    fn subscribe(&self) -> broadcast::Receiver<EventRecord>;

    /// Reads every stored record with `sequence >= from`, in order.
    fn read_from(&self, from: u64) -> Result<Vec<EventRecord>>;

    /// Sequence number the next append will receive.
    fn next_sequence(&self) -> u64;
}
