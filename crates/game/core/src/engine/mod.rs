//! State transitions for the territory game.
//!
//! The [`GameEngine`] is the authoritative reducer for [`GameState`]. It
//! borrows the state mutably for the duration of one operation, applies the
//! rules from [`GameConfig`], and reports what happened as a typed outcome so
//! the runtime can turn it into events. The engine never reads a clock and
//! never performs I/O.

mod errors;
mod registry;
mod round;
mod territory;

pub use errors::{PlaceError, RegistryError};
pub use registry::{ConnectionChange, JoinKind, PlayerJoin};
pub use round::{RoundTransition, determine_winner};
pub use territory::{Claim, Placement};

use crate::config::GameConfig;
use crate::state::GameState;

/// Game engine that applies registry, territory and round rules.
///
/// Callers are expected to hold whatever lock guards `state`; every method
/// leaves the state consistent before returning, so an operation is atomic
/// from the point of view of anyone who can only observe it under that lock.
pub struct GameEngine<'a> {
    state: &'a mut GameState,
    config: &'a GameConfig,
}

impl<'a> GameEngine<'a> {
    /// Creates a new game engine over the given state.
    pub fn new(state: &'a mut GameState, config: &'a GameConfig) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> &GameState {
        self.state
    }
}
