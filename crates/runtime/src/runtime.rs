//! High-level runtime orchestrator.
//!
//! The runtime owns the scheduler task, wires up the shared state, event bus
//! and distribution, and exposes a builder-based API for embedding the game.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use game_core::{GameConfig, GameState, RegenPolicy};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::clock::Clock;
use crate::distribution::{Distribution, LocalDistribution, ReplicatedDistribution};
use crate::events::{Event, EventBus, Topic};
use crate::repository::{
    EventRetention, FileEventLog, FileSnapshotStore, InMemoryEventLog, InMemorySnapshotStore,
};
use crate::shared::{GameCell, Shared};
use crate::workers::{Follower, Scheduler};

/// Whether this runtime owns the game or mirrors another instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeRole {
    /// Runs the scheduler and persists snapshots. One per shared store.
    #[default]
    Primary,
    /// Applies the primary's snapshots from the shared store and rejects
    /// mutations.
    Follower,
}

/// Where snapshots and events go beyond this process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DistributionMode {
    /// In-process only.
    #[default]
    Local,
    /// Replicated through an in-memory store and log (tests, demos).
    InMemory,
    /// Replicated through files under `data_dir`.
    File { data_dir: PathBuf },
}

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub game_config: GameConfig,
    /// Period of the coalescing snapshot broadcast.
    pub broadcast_interval: Duration,
    /// Capacity of each event bus topic.
    pub event_buffer_size: usize,
    pub distribution: DistributionMode,
    /// Followers need a store whose watch sees the primary's writes, i.e.
    /// a [`ReplicatedDistribution`] shared within one process.
    pub role: RuntimeRole,
    /// Bounds on the replicated event log.
    pub event_retention: EventRetention,
}

impl RuntimeConfig {
    pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(50);
    pub const DEFAULT_DATA_DIR: &'static str = "./data";

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `BITSPLAT_GRID_WIDTH` / `BITSPLAT_GRID_HEIGHT` - Grid size (default: 40 × 25)
    /// - `BITSPLAT_MAX_BITS` - Balance cap (default: 10)
    /// - `BITSPLAT_BITS_PER_TICK` - Bits granted per regen tick (default: 1)
    /// - `BITSPLAT_REGEN_INTERVAL_MS` - Regen period (default: 4000)
    /// - `BITSPLAT_REGEN_CONNECTED_ONLY` - Skip idle players on regen (default: false)
    /// - `BITSPLAT_ACTION_COOLDOWN_MS` - Cooldown between claims (default: 200)
    /// - `BITSPLAT_ROUND_SECS` - Round length (default: 180)
    /// - `BITSPLAT_POST_ROUND_SECS` - Pause after a round (default: 10)
    /// - `BITSPLAT_PRE_ROUND_SECS` - Countdown before a round (default: 5)
    /// - `BITSPLAT_BROADCAST_INTERVAL_MS` - Snapshot broadcast period (default: 50)
    /// - `BITSPLAT_EVENT_BUFFER` - Event bus capacity per topic (default: 256)
    /// - `BITSPLAT_DISTRIBUTION` - `local`, `memory` or `file` (default: local)
    /// - `BITSPLAT_DATA_DIR` - Directory for `file` distribution (default: ./data)
    /// - `BITSPLAT_EVENT_MAX_RECORDS` - Event log record cap (default: 100000)
    /// - `BITSPLAT_EVENT_MAX_AGE_SECS` - Event log age cap, 0 disables (default: 86400)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let game = &mut config.game_config;

        if let Some(width) = read_env::<u32>(&lookup, "BITSPLAT_GRID_WIDTH") {
            game.grid_width = width.clamp(1, GameConfig::MAX_GRID_SIDE);
        }
        if let Some(height) = read_env::<u32>(&lookup, "BITSPLAT_GRID_HEIGHT") {
            game.grid_height = height.clamp(1, GameConfig::MAX_GRID_SIDE);
        }
        if let Some(max_bits) = read_env(&lookup, "BITSPLAT_MAX_BITS") {
            game.max_bits = max_bits;
        }
        if let Some(step) = read_env(&lookup, "BITSPLAT_BITS_PER_TICK") {
            game.bits_per_tick = step;
        }
        if let Some(ms) = read_env::<u64>(&lookup, "BITSPLAT_REGEN_INTERVAL_MS") {
            game.regen_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(true) = read_env_bool(&lookup, "BITSPLAT_REGEN_CONNECTED_ONLY") {
            game.regen_policy = RegenPolicy::ConnectedOnly;
        }
        if let Some(ms) = read_env(&lookup, "BITSPLAT_ACTION_COOLDOWN_MS") {
            game.action_cooldown = Duration::from_millis(ms);
        }
        if let Some(secs) = read_env(&lookup, "BITSPLAT_ROUND_SECS") {
            game.round_duration = Duration::from_secs(secs);
        }
        if let Some(secs) = read_env(&lookup, "BITSPLAT_POST_ROUND_SECS") {
            game.post_round_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = read_env(&lookup, "BITSPLAT_PRE_ROUND_SECS") {
            game.pre_round_countdown = Duration::from_secs(secs);
        }

        if let Some(ms) = read_env::<u64>(&lookup, "BITSPLAT_BROADCAST_INTERVAL_MS") {
            config.broadcast_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(capacity) = read_env::<usize>(&lookup, "BITSPLAT_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        let data_dir = lookup("BITSPLAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_DATA_DIR));
        match lookup("BITSPLAT_DISTRIBUTION").map(|mode| mode.to_lowercase()).as_deref() {
            Some("memory") => config.distribution = DistributionMode::InMemory,
            Some("file") => config.distribution = DistributionMode::File { data_dir },
            _ => {}
        }

        let retention = &mut config.event_retention;
        if let Some(max_records) = read_env::<usize>(&lookup, "BITSPLAT_EVENT_MAX_RECORDS") {
            retention.max_records = max_records.max(1);
        }
        if let Some(secs) = read_env::<u64>(&lookup, "BITSPLAT_EVENT_MAX_AGE_SECS") {
            retention.max_age = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game_config: GameConfig::default(),
            broadcast_interval: Self::DEFAULT_BROADCAST_INTERVAL,
            event_buffer_size: 256,
            distribution: DistributionMode::Local,
            role: RuntimeRole::Primary,
            event_retention: EventRetention::default(),
        }
    }
}

fn read_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    lookup(key)?.trim().parse().ok()
}

fn read_env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    match lookup(key)?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Main runtime that owns the background worker
///
/// A primary runs the scheduler; a follower runs the snapshot mirror.
/// [`RuntimeHandle`] provides a cloneable façade for clients. Dropping the
/// runtime stops the worker; handles stay usable but the state stops
/// changing.
pub struct Runtime {
    handle: RuntimeHandle,
    stop_tx: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Subscribe to one event topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// On a primary, a pending dirty snapshot is broadcast and persisted
    /// before the scheduler exits.
    pub async fn shutdown(self) -> Result<()> {
        if self.stop_tx.send(()).is_err() {
            debug!("Worker already exited before shutdown");
        }
        self.worker.await.map_err(RuntimeError::WorkerJoin)?;
        info!("Runtime shut down");
        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    distribution: Option<Arc<dyn Distribution>>,
    clock: Option<Clock>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            distribution: None,
            clock: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the game rules
    pub fn game_config(mut self, game_config: GameConfig) -> Self {
        self.config.game_config = game_config;
        self
    }

    /// Use an explicit distribution instead of the configured mode.
    ///
    /// A shared [`ReplicatedDistribution`] takes exactly one
    /// [`RuntimeRole::Primary`]; every other runtime on it must be a
    /// [`RuntimeRole::Follower`].
    pub fn distribution(mut self, distribution: Arc<dyn Distribution>) -> Self {
        self.distribution = Some(distribution);
        self
    }

    /// Run as primary or follower
    pub fn role(mut self, role: RuntimeRole) -> Self {
        self.config.role = role;
        self
    }

    /// Use a specific clock (tests)
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the runtime and starts its worker.
    ///
    /// Restores the persisted snapshot if the distribution has one. A
    /// primary persists the fresh state otherwise and starts the scheduler;
    /// a follower starts mirroring the shared store and fails with
    /// [`RuntimeError::NoSharedStore`] when there is none. Failing to open or
    /// write the configured store is fatal.
    pub async fn build(self) -> Result<Runtime> {
        let RuntimeBuilder {
            config,
            distribution,
            clock,
        } = self;

        let distribution = match distribution {
            Some(distribution) => distribution,
            None => open_distribution(&config)?,
        };
        let clock = clock.unwrap_or_default();
        let game_config = config.game_config;
        let role = config.role;

        // Subscribe before loading so no write slips between the two.
        let watcher = match role {
            RuntimeRole::Primary => None,
            RuntimeRole::Follower => {
                Some(distribution.watch()?.ok_or(RuntimeError::NoSharedStore)?)
            }
        };

        let cell = match distribution.load_snapshot().await? {
            Some(snapshot) => {
                info!(
                    "Restored snapshot v{} ({} round)",
                    snapshot.version, snapshot.round_state
                );
                GameCell::new(snapshot.restore(&game_config)?, snapshot.version)
            }
            None => {
                let cell = GameCell::new(GameState::new(&game_config), 0);
                if role == RuntimeRole::Primary {
                    distribution
                        .save_snapshot(&cell.capture(clock.next_stamp()))
                        .await?;
                }
                cell
            }
        };

        let initial = Arc::new(cell.capture(clock.next_stamp()));
        let (snapshots, _) = watch::channel(initial);

        let shared = Arc::new(Shared {
            game: RwLock::new(cell),
            config: game_config,
            bus: EventBus::with_capacity(config.event_buffer_size),
            distribution,
            clock,
            snapshots,
            role,
        });

        let (stop_tx, stop_rx) = oneshot::channel();
        let worker = match watcher {
            None => {
                let scheduler = Scheduler::new(Arc::clone(&shared), config.broadcast_interval);
                tokio::spawn(scheduler.run(stop_rx))
            }
            Some(watcher) => {
                let follower = Follower::new(Arc::clone(&shared), watcher);
                tokio::spawn(follower.run(stop_rx))
            }
        };

        info!(
            "Runtime started as {:?} with {} distribution",
            role,
            shared.distribution.name()
        );

        Ok(Runtime {
            handle: RuntimeHandle::new(shared),
            stop_tx,
            worker,
        })
    }
}

fn open_distribution(config: &RuntimeConfig) -> Result<Arc<dyn Distribution>> {
    let retention = config.event_retention;
    let distribution: Arc<dyn Distribution> = match &config.distribution {
        DistributionMode::Local => Arc::new(LocalDistribution),
        DistributionMode::InMemory => Arc::new(ReplicatedDistribution::new(
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(InMemoryEventLog::with_retention(retention)),
        )),
        DistributionMode::File { data_dir } => Arc::new(ReplicatedDistribution::new(
            Arc::new(FileSnapshotStore::new(data_dir)?),
            Arc::new(FileEventLog::open_with(data_dir, retention)?),
        )),
    };
    Ok(distribution)
}
