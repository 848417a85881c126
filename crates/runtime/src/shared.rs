//! State and plumbing shared by the handle and the scheduler.

use std::sync::Arc;

use game_core::{GameConfig, GameEngine, GameState};
use tokio::sync::{RwLock, watch};
use tracing::warn;

use crate::api::{Result, RuntimeError};
use crate::clock::Clock;
use crate::distribution::Distribution;
use crate::events::{Event, EventBus};
use crate::runtime::RuntimeRole;
use crate::snapshot::GameSnapshot;

/// The authoritative state plus its change bookkeeping.
pub(crate) struct GameCell {
    pub state: GameState,
    /// Set by every mutation, cleared by the broadcast tick.
    pub dirty: bool,
    /// Number of mutations applied so far.
    pub version: u64,
}

impl GameCell {
    pub fn new(state: GameState, version: u64) -> Self {
        Self {
            state,
            dirty: false,
            version,
        }
    }

    pub fn engine<'a>(&'a mut self, config: &'a GameConfig) -> GameEngine<'a> {
        GameEngine::new(&mut self.state, config)
    }

    /// Records a mutation.
    pub fn touch(&mut self) {
        self.dirty = true;
        self.version += 1;
    }

    pub fn capture(&self, timestamp: u64) -> GameSnapshot {
        GameSnapshot::capture(&self.state, self.version, timestamp)
    }
}

pub(crate) struct Shared {
    /// Single lock around the whole aggregate.
    pub game: RwLock<GameCell>,
    pub config: GameConfig,
    pub bus: EventBus,
    pub distribution: Arc<dyn Distribution>,
    pub clock: Clock,
    /// Latest broadcast snapshot for in-process watchers.
    pub snapshots: watch::Sender<Arc<GameSnapshot>>,
    pub role: RuntimeRole,
}

impl Shared {
    /// Rejects state mutations on a follower.
    pub fn ensure_writable(&self) -> Result<()> {
        match self.role {
            RuntimeRole::Primary => Ok(()),
            RuntimeRole::Follower => Err(RuntimeError::ReadOnly),
        }
    }

    /// Publishes events in-process and to the distribution.
    ///
    /// Must be called after the state lock is released. Distribution
    /// failures are logged; the events have already been applied.
    pub async fn publish(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            let envelope = self.bus.publish(event, self.clock.now_millis());
            if let Err(err) = self.distribution.publish_event(&envelope).await {
                warn!("Failed to publish {}: {}", envelope.subject(), err);
            }
        }
    }

    /// Takes a consistent snapshot under the read lock.
    pub async fn snapshot(&self) -> GameSnapshot {
        let game = self.game.read().await;
        game.capture(self.clock.next_stamp())
    }
}
