//! Deterministic rules and data types for the territory game.
//!
//! `game-core` defines the canonical state (grid, team roster, round
//! bookkeeping) and the pure operations that mutate it. Nothing in this crate
//! reads a clock, spawns tasks or performs I/O: callers supply timestamps and
//! drive the round clock. All state mutation flows through
//! [`engine::GameEngine`], and the runtime depends on the types re-exported
//! here.
pub mod config;
pub mod engine;
pub mod error;
pub mod state;

pub use config::{GameConfig, RegenPolicy, TeamSpec};
pub use engine::{
    Claim, ConnectionChange, GameEngine, JoinKind, PlaceError, Placement, PlayerJoin,
    RegistryError, RoundTransition, determine_winner,
};
pub use error::{ErrorSeverity, GameError};
pub use state::{
    Cell, CellOwner, GameState, Grid, ParsePositionError, Player, PlayerId, Position, RoundState,
    Team, TeamId, Timestamp,
};
