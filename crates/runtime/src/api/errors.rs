//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from the game rules, persistence and background tasks so
//! clients can bubble them up with consistent context.
use thiserror::Error;

use game_core::{ErrorSeverity, GameError, PlaceError, RegistryError};

pub use crate::events::SubjectError;
pub use crate::repository::RepositoryError;
pub use crate::snapshot::SnapshotError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Place(#[from] PlaceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Subject(#[from] SubjectError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background task join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("watch source closed")]
    WatchClosed,

    #[error("follower runtimes are read-only")]
    ReadOnly,

    #[error("follower mode needs a distribution with a shared snapshot store")]
    NoSharedStore,
}

impl RuntimeError {
    /// Severity of a rule rejection, if this error is one.
    ///
    /// Infrastructure failures have no game-level severity.
    pub fn severity(&self) -> Option<ErrorSeverity> {
        match self {
            RuntimeError::Place(err) => Some(err.severity()),
            RuntimeError::Registry(err) => Some(err.severity()),
            _ => None,
        }
    }

    /// True for rejections the caller may simply retry later.
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_some_and(|severity| severity.is_recoverable())
    }
}
