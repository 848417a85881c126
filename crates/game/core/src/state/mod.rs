//! Authoritative game state representation.
//!
//! This module owns the data structures that describe the grid, the team
//! roster and the round bookkeeping. Runtime layers clone or query this
//! state but mutate it exclusively through the engine.
pub mod types;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::GameConfig;
pub use types::{
    Cell, CellOwner, Grid, ParsePositionError, Player, PlayerId, Position, RoundState, Team,
    TeamId, Timestamp,
};

/// The entire authoritative world.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    pub grid: Grid,
    /// Teams keyed by id. Iteration is in ascending id order.
    pub teams: BTreeMap<TeamId, Team>,
    pub round_state: RoundState,
    pub round_time_remaining: Duration,
    pub countdown: Duration,
    pub winner: Option<TeamId>,
}

impl GameState {
    /// Creates the startup state: neutral grid, roster populated, waiting for
    /// the first round.
    pub fn new(config: &GameConfig) -> Self {
        let teams = config
            .teams
            .iter()
            .map(|team| {
                let id = TeamId(team.id.clone());
                (id.clone(), Team::new(id, team.color.clone()))
            })
            .collect();

        Self {
            grid: Grid::new(config.grid_width, config.grid_height),
            teams,
            round_state: RoundState::Waiting,
            round_time_remaining: config.round_duration,
            countdown: config.pre_round_countdown,
            winner: None,
        }
    }

    /// Looks up a player and the team that owns it.
    pub fn find_player(&self, player: &str) -> Option<(&Player, &Team)> {
        self.teams
            .values()
            .find_map(|team| team.players.get(player).map(|p| (p, team)))
    }

    pub fn find_player_mut(&mut self, player: &str) -> Option<&mut Player> {
        self.teams
            .values_mut()
            .find_map(|team| team.players.get_mut(player))
    }

    pub fn team(&self, team: &str) -> Option<&Team> {
        self.teams.get(team)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.teams.values().flat_map(|team| team.players.values())
    }

    pub fn player_count(&self) -> usize {
        self.teams.values().map(Team::member_count).sum()
    }
}
