//! Runtime orchestration for the territory game.
//!
//! This crate wires the pure rules from `game-core` into a running service:
//! one lock around the authoritative state, a scheduler driving rounds and
//! the bit economy, and snapshot/event distribution to observers. Consumers
//! embed [`Runtime`] and interact with the game through [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, builder and configuration
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based event bus and wire envelopes
//! - [`snapshot`] and [`distribution`] publish state beyond the lock
//! - [`repository`] provides the stores backing replicated distribution
//! - `workers` keeps the scheduler and the follower loop internal to the crate
pub mod api;
pub mod clock;
pub mod distribution;
pub mod events;
pub mod repository;
pub mod runtime;
pub mod snapshot;

mod shared;
mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use clock::Clock;
pub use distribution::{
    Distribution, EventStream, LocalDistribution, ReplicatedDistribution, SnapshotWatcher,
};
pub use events::{
    BitPlacedEvent, CustomEvent, Event, EventBus, EventEnvelope, PlayerEvent, PlayerEventKind,
    PlayerUpdateEvent, RoundEvent, SubjectFilter, Topic,
};
pub use repository::{
    EventLog, EventRecord, EventRetention, FileEventLog, FileSnapshotStore, InMemoryEventLog,
    InMemorySnapshotStore, KvEntry, RepositoryError, SnapshotStore,
};
pub use runtime::{DistributionMode, Runtime, RuntimeBuilder, RuntimeConfig, RuntimeRole};
pub use snapshot::{GameSnapshot, PlayerSnapshot, SNAPSHOT_KEY, TeamSnapshot};
