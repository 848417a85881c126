//! Serializable, self-contained views of the game state.
//!
//! A [`GameSnapshot`] is a deep copy: nothing in it aliases the live state,
//! so it can be handed to any number of observers and persisted as JSON
//! under the well-known store key.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use game_core::{
    Cell, GameConfig, GameState, ParsePositionError, Player, Position, RoundState, Team, TeamId,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store key the authoritative snapshot lives under.
pub const SNAPSHOT_KEY: &str = "current";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid grid key: {0}")]
    InvalidPosition(#[from] ParsePositionError),

    #[error("cell {0} lies outside the configured grid")]
    OutOfBounds(Position),

    #[error("team {0} is not part of the configured roster")]
    UnknownTeam(String),

    #[error("player {0} appears more than once")]
    DuplicatePlayer(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: String,
    pub team_id: String,
    pub color: String,
    pub bits: u32,
    /// Milliseconds timestamp of the last consuming placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<u64>,
    pub is_connected: bool,
}

impl From<&Player> for PlayerSnapshot {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.to_string(),
            team_id: player.team_id.to_string(),
            color: player.color.clone(),
            bits: player.bits,
            last_action: player.last_action_at.map(Timestamp::as_millis),
            is_connected: player.connected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSnapshot {
    pub id: String,
    pub color: String,
    pub score: u32,
    pub percentage: f32,
    pub active_count: u32,
    pub idle_count: u32,
    pub players: Vec<PlayerSnapshot>,
}

impl From<&Team> for TeamSnapshot {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id.to_string(),
            color: team.color.clone(),
            score: team.score,
            percentage: team.percentage,
            active_count: team.active_count,
            idle_count: team.idle_count,
            players: team.players.values().map(PlayerSnapshot::from).collect(),
        }
    }
}

/// Point-in-time copy of the whole game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// Cells keyed by `"x:y"`.
    pub grid: BTreeMap<String, Cell>,
    pub teams: BTreeMap<String, TeamSnapshot>,
    pub round_state: RoundState,
    /// Milliseconds left in the running round.
    pub round_time_remaining: u64,
    /// Milliseconds left before the next phase change outside a round.
    pub countdown: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<TeamSnapshot>,
    /// Milliseconds since the Unix epoch; strictly increasing per runtime.
    pub timestamp: u64,
    /// Mutation counter of the state this snapshot was taken from.
    #[serde(default)]
    pub version: u64,
}

impl GameSnapshot {
    /// Copies `state` into a snapshot.
    pub fn capture(state: &GameState, version: u64, timestamp: u64) -> Self {
        let teams = state
            .teams
            .values()
            .map(|team| (team.id.to_string(), TeamSnapshot::from(team)))
            .collect::<BTreeMap<_, _>>();

        let winner = state
            .winner
            .as_ref()
            .and_then(|id| teams.get(id.as_str()))
            .cloned();

        Self {
            grid: state
                .grid
                .iter()
                .map(|(position, cell)| (position.key(), cell))
                .collect(),
            teams,
            round_state: state.round_state,
            round_time_remaining: millis(state.round_time_remaining),
            countdown: millis(state.countdown),
            winner,
            timestamp,
            version,
        }
    }

    /// Rebuilds authoritative state from a stored snapshot.
    ///
    /// The roster and grid bounds come from `config`; the snapshot supplies
    /// ownership, scores, players and round timers.
    pub fn restore(&self, config: &GameConfig) -> Result<GameState, SnapshotError> {
        let mut state = GameState::new(config);

        for (key, cell) in &self.grid {
            let position: Position = key.parse()?;
            if !state.grid.contains(position) {
                return Err(SnapshotError::OutOfBounds(position));
            }
            if let Some(team) = cell.owner.team()
                && !state.teams.contains_key(team)
            {
                return Err(SnapshotError::UnknownTeam(team.to_string()));
            }
            state.grid.set(position, cell.clone());
        }

        let mut seen = HashSet::new();
        for snapshot in self.teams.values() {
            let team = state
                .teams
                .get_mut(snapshot.id.as_str())
                .ok_or_else(|| SnapshotError::UnknownTeam(snapshot.id.clone()))?;

            team.score = snapshot.score;
            team.percentage = config.percentage_of(snapshot.score);
            for player in &snapshot.players {
                if !seen.insert(player.id.as_str()) {
                    return Err(SnapshotError::DuplicatePlayer(player.id.clone()));
                }
                let mut restored = Player::new(player.id.clone().into(), team, player.bits);
                restored.bits = player.bits.min(config.max_bits);
                restored.last_action_at = player.last_action.map(Timestamp::from_millis);
                restored.connected = player.is_connected;
                team.players.insert(restored.id.clone(), restored);
            }
            team.recount();
        }

        state.round_state = self.round_state;
        state.round_time_remaining = Duration::from_millis(self.round_time_remaining);
        state.countdown = Duration::from_millis(self.countdown);
        state.winner = self.winner.as_ref().map(|team| TeamId(team.id.clone()));

        Ok(state)
    }

    pub fn team(&self, id: &str) -> Option<&TeamSnapshot> {
        self.teams.get(id)
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.grid.get(&Position::new(x, y).key())
    }

    pub fn player(&self, id: &str) -> Option<&PlayerSnapshot> {
        self.teams
            .values()
            .flat_map(|team| team.players.iter())
            .find(|player| player.id == id)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use game_core::GameEngine;
    use serde_json::json;

    use super::*;

    fn played_state(config: &GameConfig) -> GameState {
        let mut state = GameState::new(config);
        let mut engine = GameEngine::new(&mut state, config);
        engine.add_player("alice").unwrap();
        engine.add_player("bob").unwrap();
        engine.start_round();
        engine
            .place_bit("alice", Position::new(3, 3), Timestamp::from_millis(1_000))
            .unwrap();
        engine.set_connected("bob", false).unwrap();
        engine.recompute_counts();
        state
    }

    #[test]
    fn snapshot_is_detached_from_state() {
        let config = GameConfig::default();
        let mut state = played_state(&config);
        let snapshot = GameSnapshot::capture(&state, 1, 10);

        state.grid.set(Position::new(3, 3), Cell::neutral());
        state.teams.get_mut("Glitchbyte").unwrap().score = 99;

        assert_eq!(snapshot.cell(3, 3).unwrap().owner.as_str(), "Glitchbyte");
        assert_eq!(snapshot.team("Glitchbyte").unwrap().score, 1);
    }

    #[test]
    fn wire_names() {
        let config = GameConfig::default();
        let snapshot = GameSnapshot::capture(&played_state(&config), 3, 1234);
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["roundState"], json!("In Progress"));
        assert_eq!(value["roundTimeRemaining"], json!(180_000));
        assert_eq!(
            value["grid"]["3:3"],
            json!({"ownerId": "Glitchbyte", "color": "#d500f9"})
        );
        assert_eq!(value["grid"]["0:0"]["ownerId"], json!("neutral"));
        assert_eq!(value["teams"]["Nullwave"]["idleCount"], json!(1));
        assert_eq!(
            value["teams"]["Nullwave"]["players"][0]["isConnected"],
            json!(false)
        );
        assert!(value.get("winner").is_none());
        assert_eq!(value["timestamp"], json!(1234));
    }

    #[test]
    fn restore_round_trips_state() {
        let config = GameConfig::default();
        let state = played_state(&config);
        let snapshot = GameSnapshot::capture(&state, 7, 99);

        let json = serde_json::to_vec(&snapshot).unwrap();
        let decoded: GameSnapshot = serde_json::from_slice(&json).unwrap();
        let restored = decoded.restore(&config).unwrap();

        assert_eq!(restored, state);
    }

    #[test]
    fn restore_rejects_foreign_roster() {
        let config = GameConfig::default();
        let mut snapshot = GameSnapshot::capture(&GameState::new(&config), 0, 0);
        snapshot.teams.insert(
            "Outsiders".to_string(),
            TeamSnapshot::from(&Team::new(TeamId::from("Outsiders"), "#ffffff")),
        );

        let err = snapshot.restore(&config).unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownTeam(id) if id == "Outsiders"));
    }

    #[test]
    fn restore_rejects_player_on_two_teams() {
        let config = GameConfig::default();
        let mut snapshot = GameSnapshot::capture(&played_state(&config), 2, 0);
        let alice = snapshot.player("alice").unwrap().clone();
        let other = snapshot
            .teams
            .values_mut()
            .find(|team| team.id != alice.team_id)
            .unwrap();
        other.players.push(alice);

        let err = snapshot.restore(&config).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicatePlayer(id) if id == "alice"));
    }
}
