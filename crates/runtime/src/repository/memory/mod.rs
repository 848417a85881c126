//! In-memory repository implementations for testing and single-host runs.

mod event_log;
mod snapshot;

pub use event_log::InMemoryEventLog;
pub use snapshot::InMemorySnapshotStore;
