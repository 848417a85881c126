//! Round state machine: countdowns, winner selection and resets.

use crate::config::GameConfig;
use crate::state::{RoundState, Team, TeamId};

use super::GameEngine;

/// A phase change produced by a round tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundTransition {
    /// Waiting → InProgress.
    Started,
    /// InProgress → Finished, with the decided winner.
    Finished { winner: Option<TeamId> },
    /// Finished → Waiting; the board has been reset.
    Reset,
}

impl GameEngine<'_> {
    /// Advances the round clock by one [`GameConfig::ROUND_TICK`].
    ///
    /// Returns the transition taken, if any. Also recomputes team head
    /// counts, which is the only place they are refreshed.
    pub fn tick_round(&mut self) -> Option<RoundTransition> {
        let step = GameConfig::ROUND_TICK;
        let transition = match self.state.round_state {
            RoundState::Waiting => {
                self.state.countdown = self.state.countdown.saturating_sub(step);
                self.state.countdown.is_zero().then(|| self.begin_round())
            }
            RoundState::InProgress => {
                self.state.round_time_remaining =
                    self.state.round_time_remaining.saturating_sub(step);
                self.state
                    .round_time_remaining
                    .is_zero()
                    .then(|| self.finish_round())
            }
            RoundState::Finished => {
                self.state.countdown = self.state.countdown.saturating_sub(step);
                self.state.countdown.is_zero().then(|| self.restart_cycle())
            }
        };

        self.recompute_counts();
        transition
    }

    /// Skips the remaining pre-round countdown.
    ///
    /// Only legal while waiting; returns `None` in any other state.
    pub fn start_round(&mut self) -> Option<RoundTransition> {
        (self.state.round_state == RoundState::Waiting).then(|| self.begin_round())
    }

    /// Clears the board for a new round.
    ///
    /// Grid back to neutral, scores and percentages to zero, every balance to
    /// `max_bits`, winner cleared. Players keep their team and connection flag.
    pub fn reset(&mut self) {
        self.state.grid.reset();
        self.state.winner = None;
        let max_bits = self.config.max_bits;
        for team in self.state.teams.values_mut() {
            team.score = 0;
            team.percentage = 0.0;
            for player in team.players.values_mut() {
                player.bits = max_bits;
            }
        }
    }

    fn begin_round(&mut self) -> RoundTransition {
        self.state.round_state = RoundState::InProgress;
        self.state.round_time_remaining = self.config.round_duration;
        RoundTransition::Started
    }

    fn finish_round(&mut self) -> RoundTransition {
        self.state.round_state = RoundState::Finished;
        self.state.countdown = self.config.post_round_delay;
        let winner = determine_winner(self.state.teams.values());
        self.state.winner = winner.clone();
        RoundTransition::Finished { winner }
    }

    fn restart_cycle(&mut self) -> RoundTransition {
        self.state.round_state = RoundState::Waiting;
        self.state.countdown = self.config.pre_round_countdown;
        self.reset();
        RoundTransition::Reset
    }
}

/// Picks the team with the highest score.
///
/// Ties go to the alphabetically first team id. Returns `None` only when
/// there are no teams at all.
pub fn determine_winner<'a>(teams: impl IntoIterator<Item = &'a Team>) -> Option<TeamId> {
    teams
        .into_iter()
        .min_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)))
        .map(|team| team.id.clone())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::{GameState, Position, Timestamp};

    fn team(id: &str, score: u32) -> Team {
        let mut team = Team::new(TeamId::from(id), "#000000");
        team.score = score;
        team
    }

    #[test]
    fn highest_score_wins() {
        let teams = [team("A", 2), team("B", 7), team("C", 3)];
        assert_eq!(determine_winner(&teams), Some(TeamId::from("B")));
    }

    #[test]
    fn ties_go_to_first_id_regardless_of_order() {
        let teams = [team("C", 3), team("B", 5), team("A", 5)];
        assert_eq!(determine_winner(&teams), Some(TeamId::from("A")));

        let teams = [team("A", 5), team("B", 5), team("C", 3)];
        assert_eq!(determine_winner(&teams), Some(TeamId::from("A")));
    }

    #[test]
    fn all_zero_still_has_a_winner() {
        let teams = [team("Voltcrash", 0), team("Glitchbyte", 0)];
        assert_eq!(determine_winner(&teams), Some(TeamId::from("Glitchbyte")));
        assert_eq!(determine_winner(std::iter::empty()), None);
    }

    #[test]
    fn full_cycle_follows_configured_timing() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let mut engine = GameEngine::new(&mut state, &config);

        let pre = config.pre_round_countdown.as_secs();
        for _ in 1..pre {
            assert_eq!(engine.tick_round(), None);
        }
        assert_eq!(engine.tick_round(), Some(RoundTransition::Started));
        assert_eq!(engine.state().round_state, RoundState::InProgress);
        assert_eq!(engine.state().round_time_remaining, config.round_duration);

        engine.add_player("p").unwrap();
        engine
            .place_bit("p", Position::new(2, 2), Timestamp::ZERO)
            .unwrap();

        for _ in 1..config.round_duration.as_secs() {
            assert_eq!(engine.tick_round(), None);
        }
        assert_eq!(
            engine.tick_round(),
            Some(RoundTransition::Finished {
                winner: Some(TeamId::from("Glitchbyte"))
            })
        );
        assert_eq!(engine.state().countdown, config.post_round_delay);

        // Placements are closed while finished.
        assert!(
            engine
                .place_bit("p", Position::new(3, 3), Timestamp::from_millis(5_000))
                .is_err()
        );

        for _ in 1..config.post_round_delay.as_secs() {
            assert_eq!(engine.tick_round(), None);
        }
        assert_eq!(engine.tick_round(), Some(RoundTransition::Reset));

        assert_eq!(state.round_state, RoundState::Waiting);
        assert_eq!(state.countdown, config.pre_round_countdown);
        assert_eq!(state.winner, None);
        assert!(state.grid.iter().all(|(_, cell)| cell.owner.is_neutral()));
        assert!(state.players().all(|p| p.bits == config.max_bits));
        assert!(state.teams.values().all(|t| t.score == 0));
        assert_eq!(state.player_count(), 1);
    }

    #[test]
    fn start_round_only_from_waiting() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let mut engine = GameEngine::new(&mut state, &config);

        assert_eq!(engine.start_round(), Some(RoundTransition::Started));
        assert_eq!(engine.start_round(), None);
        assert_eq!(engine.state().round_time_remaining, config.round_duration);
    }

    #[test]
    fn tick_refreshes_counts() {
        let config = GameConfig::default().with_round_timing(
            Duration::from_secs(10),
            Duration::from_secs(10),
            Duration::from_secs(10),
        );
        let mut state = GameState::new(&config);
        let mut engine = GameEngine::new(&mut state, &config);
        engine.add_player("p").unwrap();
        engine.set_connected("p", false).unwrap();
        engine.tick_round();

        let team = state.team("Glitchbyte").unwrap();
        assert_eq!((team.active_count, team.idle_count), (0, 1));
    }
}
