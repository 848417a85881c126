//! Mirror loop for follower runtimes.
//!
//! A follower never ticks the game itself. It applies every snapshot the
//! primary persists to the shared store, so reads through its handle see the
//! primary's state.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::api::{Result, RuntimeError};
use crate::distribution::SnapshotWatcher;
use crate::shared::Shared;
use crate::snapshot::GameSnapshot;

pub(crate) struct Follower {
    shared: Arc<Shared>,
    watcher: SnapshotWatcher,
}

impl Follower {
    pub(crate) fn new(shared: Arc<Shared>, watcher: SnapshotWatcher) -> Self {
        Self { shared, watcher }
    }

    /// Returns once `stop` fires, its sender is dropped or the store closes.
    pub(crate) async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        info!("Follower started");

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut stop => break,
                next = self.watcher.next() => next,
            };

            match next {
                Ok(snapshot) => {
                    if let Err(err) = self.apply(snapshot).await {
                        warn!("Skipping snapshot that does not restore: {}", err);
                    }
                }
                Err(RuntimeError::WatchClosed) => {
                    warn!("Snapshot store closed, follower stopping");
                    break;
                }
                Err(err) => warn!("Skipping undecodable snapshot: {}", err),
            }
        }

        info!("Follower stopped");
    }

    async fn apply(&self, snapshot: GameSnapshot) -> Result<()> {
        let state = snapshot.restore(&self.shared.config)?;
        {
            let mut game = self.shared.game.write().await;
            game.state = state;
            game.version = snapshot.version;
            game.dirty = false;
        }

        debug!("Applied snapshot v{}", snapshot.version);
        self.shared.snapshots.send_replace(Arc::new(snapshot));
        Ok(())
    }
}
