//! In-memory SnapshotStore implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;

use crate::repository::types::KvEntry;
use crate::repository::watchers::KeyWatchers;
use crate::repository::{RepositoryError, Result, SnapshotStore};

/// In-memory implementation of SnapshotStore.
///
/// Shared between runtimes through an `Arc`, it behaves like a replicated
/// bucket within one process.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    entries: Mutex<HashMap<String, KvEntry>>,
    watchers: KeyWatchers,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;

        let revision = entries.get(key).map_or(0, |entry| entry.revision) + 1;
        let entry = KvEntry {
            key: key.to_string(),
            revision,
            value,
        };
        entries.insert(key.to_string(), entry.clone());
        self.watchers.notify(entry);

        Ok(revision)
    }

    fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn watch(&self, key: &str) -> Result<watch::Receiver<Option<KvEntry>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        self.watchers.subscribe(key, || entries.get(key).cloned())
    }
}
