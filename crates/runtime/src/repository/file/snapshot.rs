//! File-based SnapshotStore implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::watch;

use crate::repository::types::KvEntry;
use crate::repository::watchers::KeyWatchers;
use crate::repository::{RepositoryError, Result, SnapshotStore};

/// File-based implementation of SnapshotStore.
///
/// Each key is stored as `{key}.kv` holding a bincode-encoded [`KvEntry`].
/// Writes go to a temp file first and are renamed into place, so readers
/// never observe a half-written snapshot.
pub struct FileSnapshotStore {
    base_dir: PathBuf,
    /// Serializes writers and watcher registration.
    write_lock: Mutex<()>,
    watchers: KeyWatchers,
}

impl FileSnapshotStore {
    /// Create a new file-based snapshot store.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
            watchers: KeyWatchers::default(),
        })
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RepositoryError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(format!("{key}.kv")))
    }

    fn read_entry(&self, key: &str) -> Result<Option<KvEntry>> {
        let path = self.entry_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let entry: KvEntry = bincode::deserialize(&bytes)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        if entry.key != key {
            return Err(RepositoryError::CorruptedData(format!(
                "{} holds key {:?}",
                path.display(),
                entry.key
            )));
        }
        Ok(Some(entry))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;

        let path = self.entry_path(key)?;
        let revision = self.read_entry(key)?.map_or(0, |entry| entry.revision) + 1;
        let entry = KvEntry {
            key: key.to_string(),
            revision,
            value,
        };

        let bytes =
            bincode::serialize(&entry).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let temp_path = path.with_extension("kv.tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved {}[rev {}] to {}", key, revision, path.display());

        self.watchers.notify(entry);
        Ok(revision)
    }

    fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        self.read_entry(key)
    }

    fn watch(&self, key: &str) -> Result<watch::Receiver<Option<KvEntry>>> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let current = self.read_entry(key)?;
        self.watchers.subscribe(key, || current)
    }
}
