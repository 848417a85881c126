//! Player registry: joining, connection flags and team head counts.

use crate::state::{Player, PlayerId, TeamId};

use super::{GameEngine, RegistryError};

/// How an `add_player` call was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    /// First contact; the player was created and assigned a team.
    New,
    /// Known player that was disconnected and is now connected again.
    Reconnected,
    /// Known player that was already connected. Nothing changed.
    AlreadyConnected,
}

/// Result of adding a player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerJoin {
    pub player: Player,
    pub kind: JoinKind,
}

impl PlayerJoin {
    /// Returns true if the call mutated state.
    pub fn changed(&self) -> bool {
        !matches!(self.kind, JoinKind::AlreadyConnected)
    }
}

/// Result of toggling a player's connection flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionChange {
    pub player: PlayerId,
    pub team: TeamId,
    pub connected: bool,
    /// False when the flag already had the requested value.
    pub changed: bool,
}

impl GameEngine<'_> {
    /// Adds a player, or reconnects it if it already exists.
    ///
    /// New players join the team with the fewest members; ties go to the
    /// team with the smallest id. They start with a full balance and may act
    /// immediately.
    pub fn add_player(&mut self, id: &str) -> Result<PlayerJoin, RegistryError> {
        if let Some(player) = self.state.find_player_mut(id) {
            let kind = if player.connected {
                JoinKind::AlreadyConnected
            } else {
                player.connected = true;
                JoinKind::Reconnected
            };
            return Ok(PlayerJoin {
                player: player.clone(),
                kind,
            });
        }

        // `min_by_key` keeps the first minimum, and teams iterate in id order.
        let team = self
            .state
            .teams
            .values_mut()
            .min_by_key(|team| team.member_count())
            .ok_or(RegistryError::NoTeams)?;

        let player = Player::new(PlayerId::from(id), team, self.config.max_bits);
        team.players.insert(player.id.clone(), player.clone());

        Ok(PlayerJoin {
            player,
            kind: JoinKind::New,
        })
    }

    /// Sets a player's connection flag.
    ///
    /// Reports `changed = false` without touching anything when the flag
    /// already has the requested value.
    pub fn set_connected(
        &mut self,
        id: &str,
        connected: bool,
    ) -> Result<ConnectionChange, RegistryError> {
        let player = self
            .state
            .find_player_mut(id)
            .ok_or_else(|| RegistryError::PlayerNotFound {
                player: PlayerId::from(id),
            })?;

        let changed = player.connected != connected;
        player.connected = connected;

        Ok(ConnectionChange {
            player: player.id.clone(),
            team: player.team_id.clone(),
            connected,
            changed,
        })
    }

    /// Recomputes every team's active and idle counts from its player map.
    pub fn recompute_counts(&mut self) {
        for team in self.state.teams.values_mut() {
            team.recount();
        }
    }
}
