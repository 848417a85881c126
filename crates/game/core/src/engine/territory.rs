//! Territory claims and the bit economy.

use crate::config::RegenPolicy;
use crate::state::{Cell, CellOwner, PlayerId, Position, TeamId, Timestamp};

use super::{GameEngine, PlaceError};

/// A consuming placement that transferred a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub player: PlayerId,
    pub team: TeamId,
    pub position: Position,
    pub previous_owner: CellOwner,
    /// Balance left after paying for the claim.
    pub bits_left: u32,
}

/// Outcome of an accepted placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// The cell already belonged to the acting team. Nothing was consumed.
    AlreadyOwned,
    /// The cell changed hands.
    Claimed(Claim),
}

impl Placement {
    /// Returns true if the placement mutated state.
    pub fn changed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }
}

impl GameEngine<'_> {
    /// Claims the cell at `position` for the player's team.
    ///
    /// Clicking a cell the team already owns is free: the ownership check
    /// runs before the bit and cooldown checks and short-circuits with
    /// [`Placement::AlreadyOwned`].
    pub fn place_bit(
        &mut self,
        player_id: &str,
        position: Position,
        now: Timestamp,
    ) -> Result<Placement, PlaceError> {
        let (player, team) =
            self.state
                .find_player(player_id)
                .ok_or_else(|| PlaceError::PlayerNotFound {
                    player: PlayerId::from(player_id),
                })?;

        if !self.state.round_state.is_active() {
            return Err(PlaceError::RoundNotActive {
                state: self.state.round_state,
            });
        }

        if !self.state.grid.contains(position) {
            return Err(PlaceError::OutOfBounds { position });
        }

        let previous_owner = self.state.grid.owner(position);
        if previous_owner.is_team(&team.id) {
            return Ok(Placement::AlreadyOwned);
        }

        if player.bits < 1 {
            return Err(PlaceError::InsufficientBits { bits: player.bits });
        }

        if let Some(last) = player.last_action_at {
            let elapsed = now.saturating_since(last);
            if elapsed < self.config.action_cooldown {
                return Err(PlaceError::OnCooldown {
                    remaining: self.config.action_cooldown - elapsed,
                });
            }
        }

        let team_id = team.id.clone();
        let team_color = team.color.clone();

        // Validation done; everything below must apply as one unit.
        let player = self
            .state
            .teams
            .get_mut(&team_id)
            .and_then(|team| team.players.get_mut(player_id))
            .ok_or_else(|| PlaceError::PlayerNotFound {
                player: PlayerId::from(player_id),
            })?;
        player.bits -= 1;
        player.last_action_at = Some(now);
        let bits_left = player.bits;
        let player_id = player.id.clone();

        self.state
            .grid
            .set(position, Cell::owned_by(team_id.clone(), team_color));

        if let Some(team) = self.state.teams.get_mut(&team_id) {
            team.score += 1;
            team.percentage = self.config.percentage_of(team.score);
        }
        if let Some(previous) = previous_owner
            .team()
            .and_then(|id| self.state.teams.get_mut(id))
        {
            previous.score = previous.score.saturating_sub(1);
            previous.percentage = self.config.percentage_of(previous.score);
        }

        Ok(Placement::Claimed(Claim {
            player: player_id,
            team: team_id,
            position,
            previous_owner,
            bits_left,
        }))
    }

    /// Grants `bits_per_tick` to every eligible player, clamped to `max_bits`.
    ///
    /// Eligibility follows the configured [`RegenPolicy`]. Returns the number
    /// of players whose balance actually grew.
    pub fn regenerate_bits(&mut self) -> usize {
        let max = self.config.max_bits;
        let step = self.config.bits_per_tick;
        let policy = self.config.regen_policy;

        let mut credited = 0;
        for team in self.state.teams.values_mut() {
            for player in team.players.values_mut() {
                let eligible = match policy {
                    RegenPolicy::AllPlayers => true,
                    RegenPolicy::ConnectedOnly => player.connected,
                };
                if eligible && player.bits < max {
                    player.bits = player.bits.saturating_add(step).min(max);
                    credited += 1;
                }
            }
        }
        credited
    }
}
