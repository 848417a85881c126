//! Per-key change notification shared by snapshot store implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;

use super::types::KvEntry;
use super::{RepositoryError, Result};

/// One `watch` channel per key, created on first use.
#[derive(Default)]
pub(crate) struct KeyWatchers {
    channels: Mutex<HashMap<String, watch::Sender<Option<KvEntry>>>>,
}

impl KeyWatchers {
    /// Subscribes to `key`, seeding a fresh channel with `current`.
    pub(crate) fn subscribe(
        &self,
        key: &str,
        current: impl FnOnce() -> Option<KvEntry>,
    ) -> Result<watch::Receiver<Option<KvEntry>>> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let sender = channels
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(current()).0);
        Ok(sender.subscribe())
    }

    /// Publishes a new entry to current watchers of its key.
    pub(crate) fn notify(&self, entry: KvEntry) {
        let Ok(channels) = self.channels.lock() else {
            tracing::warn!("Watcher registry poisoned, dropping notification");
            return;
        };
        if let Some(sender) = channels.get(&entry.key) {
            sender.send_replace(Some(entry));
        }
    }
}
