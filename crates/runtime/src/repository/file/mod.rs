//! File-based repository implementations.

mod event_log;
mod log;
mod snapshot;

pub use event_log::FileEventLog;
pub use log::FileRepository;
pub use snapshot::FileSnapshotStore;
