//! Snapshot and event distribution.
//!
//! A runtime always publishes in-process (watch channel and [`EventBus`]).
//! A [`Distribution`] adds the cross-instance side: persisting snapshots to a
//! keyed store, following that store, and appending events to a log. The
//! [`LocalDistribution`] has no cross-instance side at all.
//!
//! [`EventBus`]: crate::events::EventBus

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::api::{Result, RuntimeError};
use crate::events::{EventEnvelope, SubjectFilter};
use crate::repository::{EventLog, EventRecord, KvEntry, SnapshotStore};
use crate::snapshot::{GameSnapshot, SNAPSHOT_KEY};

/// Cross-instance publication of snapshots and events.
#[async_trait]
pub trait Distribution: Send + Sync {
    /// Persists the latest snapshot under the well-known key.
    async fn save_snapshot(&self, snapshot: &GameSnapshot) -> Result<()>;

    /// Loads the persisted snapshot, if any.
    async fn load_snapshot(&self) -> Result<Option<GameSnapshot>>;

    /// Follows persisted snapshots. `None` when there is no shared store.
    fn watch(&self) -> Result<Option<SnapshotWatcher>>;

    /// Appends an event to the shared log.
    async fn publish_event(&self, envelope: &EventEnvelope) -> Result<()>;

    /// Follows the shared log. `None` when there is no shared log.
    fn subscribe_events(&self, filter: SubjectFilter) -> Option<EventStream>;

    fn name(&self) -> &'static str;
}

/// Single-instance distribution; everything stays in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDistribution;

#[async_trait]
impl Distribution for LocalDistribution {
    async fn save_snapshot(&self, _snapshot: &GameSnapshot) -> Result<()> {
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<GameSnapshot>> {
        Ok(None)
    }

    fn watch(&self) -> Result<Option<SnapshotWatcher>> {
        Ok(None)
    }

    async fn publish_event(&self, _envelope: &EventEnvelope) -> Result<()> {
        Ok(())
    }

    fn subscribe_events(&self, _filter: SubjectFilter) -> Option<EventStream> {
        None
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Distribution over a [`SnapshotStore`] and an [`EventLog`].
///
/// Snapshots are stored as JSON under [`SNAPSHOT_KEY`]; events are appended
/// as JSON envelopes on their `game.<type>` subject. Blocking repository
/// calls run on tokio's blocking pool.
#[derive(Clone)]
pub struct ReplicatedDistribution {
    store: Arc<dyn SnapshotStore>,
    log: Arc<dyn EventLog>,
}

impl ReplicatedDistribution {
    pub fn new(store: Arc<dyn SnapshotStore>, log: Arc<dyn EventLog>) -> Self {
        Self { store, log }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub fn log(&self) -> &Arc<dyn EventLog> {
        &self.log
    }
}

#[async_trait]
impl Distribution for ReplicatedDistribution {
    async fn save_snapshot(&self, snapshot: &GameSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot)?;
        let store = Arc::clone(&self.store);
        let revision = tokio::task::spawn_blocking(move || store.put(SNAPSHOT_KEY, bytes))
            .await
            .map_err(RuntimeError::WorkerJoin)??;

        debug!(
            "Saved snapshot v{} as revision {}",
            snapshot.version, revision
        );
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<GameSnapshot>> {
        let store = Arc::clone(&self.store);
        let entry = tokio::task::spawn_blocking(move || store.get(SNAPSHOT_KEY))
            .await
            .map_err(RuntimeError::WorkerJoin)??;

        entry
            .map(|entry| serde_json::from_slice(&entry.value).map_err(RuntimeError::from))
            .transpose()
    }

    fn watch(&self) -> Result<Option<SnapshotWatcher>> {
        let rx = self.store.watch(SNAPSHOT_KEY)?;
        Ok(Some(SnapshotWatcher::from_store(rx)))
    }

    async fn publish_event(&self, envelope: &EventEnvelope) -> Result<()> {
        let subject = envelope.subject();
        let bytes = serde_json::to_vec(envelope)?;
        let log = Arc::clone(&self.log);
        tokio::task::spawn_blocking(move || log.append(&subject, bytes))
            .await
            .map_err(RuntimeError::WorkerJoin)??;
        Ok(())
    }

    fn subscribe_events(&self, filter: SubjectFilter) -> Option<EventStream> {
        Some(EventStream::from_log(self.log.subscribe(), filter))
    }

    fn name(&self) -> &'static str {
        "replicated"
    }
}

/// Lazy sequence of changed snapshots.
///
/// The value current at subscription time is never yielded; each call to
/// [`next`](Self::next) waits for the next change. Watchers that fall behind
/// skip straight to the latest snapshot.
pub struct SnapshotWatcher {
    source: WatchSource,
}

enum WatchSource {
    Local(watch::Receiver<Arc<GameSnapshot>>),
    Store(watch::Receiver<Option<KvEntry>>),
}

impl SnapshotWatcher {
    pub(crate) fn local(rx: watch::Receiver<Arc<GameSnapshot>>) -> Self {
        Self {
            source: WatchSource::Local(rx),
        }
    }

    pub fn from_store(rx: watch::Receiver<Option<KvEntry>>) -> Self {
        Self {
            source: WatchSource::Store(rx),
        }
    }

    /// Waits for the next snapshot.
    ///
    /// Fails with [`RuntimeError::WatchClosed`] once the source is gone and
    /// with [`RuntimeError::Serialization`] when a stored value cannot be
    /// decoded; the watcher stays usable after a decode error.
    pub async fn next(&mut self) -> Result<GameSnapshot> {
        match &mut self.source {
            WatchSource::Local(rx) => {
                rx.changed().await.map_err(|_| RuntimeError::WatchClosed)?;
                let snapshot = rx.borrow_and_update();
                Ok(GameSnapshot::clone(&snapshot))
            }
            WatchSource::Store(rx) => loop {
                rx.changed().await.map_err(|_| RuntimeError::WatchClosed)?;
                let entry = rx.borrow_and_update().clone();
                if let Some(entry) = entry {
                    return Ok(serde_json::from_slice(&entry.value)?);
                }
            },
        }
    }
}

/// Filtered sequence of event envelopes.
pub struct EventStream {
    source: StreamSource,
    filter: SubjectFilter,
}

enum StreamSource {
    Bus(broadcast::Receiver<EventEnvelope>),
    Log(broadcast::Receiver<EventRecord>),
}

impl EventStream {
    pub(crate) fn from_bus(rx: broadcast::Receiver<EventEnvelope>, filter: SubjectFilter) -> Self {
        Self {
            source: StreamSource::Bus(rx),
            filter,
        }
    }

    pub fn from_log(rx: broadcast::Receiver<EventRecord>, filter: SubjectFilter) -> Self {
        Self {
            source: StreamSource::Log(rx),
            filter,
        }
    }

    pub fn filter(&self) -> &SubjectFilter {
        &self.filter
    }

    /// Waits for the next event whose subject matches the filter.
    ///
    /// Events dropped because this stream lagged are logged and skipped.
    pub async fn next(&mut self) -> Result<EventEnvelope> {
        loop {
            match &mut self.source {
                StreamSource::Bus(rx) => match rx.recv().await {
                    Ok(envelope) if self.filter.matches(&envelope.subject()) => {
                        return Ok(envelope);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event stream lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(RuntimeError::WatchClosed);
                    }
                },
                StreamSource::Log(rx) => match rx.recv().await {
                    Ok(record) if self.filter.matches(&record.subject) => {
                        return Ok(serde_json::from_slice(&record.payload)?);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event log stream lagged, skipped {} records", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(RuntimeError::WatchClosed);
                    }
                },
            }
        }
    }
}
