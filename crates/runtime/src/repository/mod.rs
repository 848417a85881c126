//! Repository layer for replicated game data.
//!
//! Repositories hold what a second runtime instance needs to follow the
//! authoritative one:
//! - Snapshots, keyed and revisioned, with change notification
//! - The append-only stream of domain events
//!
//! Both come in an in-memory flavour (tests, single host) and a file-backed
//! one (survives restarts).

mod error;
mod traits;
mod types;
mod watchers;

pub mod file;
pub mod memory;

pub use error::{RepositoryError, Result};
pub use file::{FileEventLog, FileRepository, FileSnapshotStore};
pub use memory::{InMemoryEventLog, InMemorySnapshotStore};
pub use traits::{EventLog, SnapshotStore};
pub use types::{EventRecord, EventRetention, KvEntry};
