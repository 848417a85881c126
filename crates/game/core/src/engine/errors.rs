//! Error types for engine operations.

use std::time::Duration;

use crate::error::{ErrorSeverity, GameError};
use crate::state::{PlayerId, Position, RoundState, TeamId};

/// Reasons a bit placement is rejected.
///
/// Validation order is fixed: player lookup, round state, bounds, then (only
/// for cells the team does not already own) bits and cooldown.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("player {player} not found")]
    PlayerNotFound { player: PlayerId },

    #[error("can only place bits during a round (round is {state})")]
    RoundNotActive { state: RoundState },

    #[error("position {position} is outside the grid")]
    OutOfBounds { position: Position },

    #[error("not enough bits ({bits} available)")]
    InsufficientBits { bits: u32 },

    #[error("action cooldown ({remaining:?} remaining)")]
    OnCooldown { remaining: Duration },
}

impl GameError for PlaceError {
    fn severity(&self) -> ErrorSeverity {
        use PlaceError::*;
        match self {
            PlayerNotFound { .. } | OutOfBounds { .. } => ErrorSeverity::Validation,
            RoundNotActive { .. } | InsufficientBits { .. } | OnCooldown { .. } => {
                ErrorSeverity::Recoverable
            }
        }
    }

    fn error_code(&self) -> &'static str {
        use PlaceError::*;
        match self {
            PlayerNotFound { .. } => "PLACE_PLAYER_NOT_FOUND",
            RoundNotActive { .. } => "PLACE_ROUND_NOT_ACTIVE",
            OutOfBounds { .. } => "PLACE_OUT_OF_BOUNDS",
            InsufficientBits { .. } => "PLACE_INSUFFICIENT_BITS",
            OnCooldown { .. } => "PLACE_ON_COOLDOWN",
        }
    }
}

/// Errors raised by registry lookups and connection changes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("player {player} not found")]
    PlayerNotFound { player: PlayerId },

    #[error("team {team} not found")]
    TeamNotFound { team: TeamId },

    #[error("no teams configured")]
    NoTeams,
}

impl GameError for RegistryError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PlayerNotFound { .. } | Self::TeamNotFound { .. } => ErrorSeverity::Validation,
            Self::NoTeams => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::PlayerNotFound { .. } => "REGISTRY_PLAYER_NOT_FOUND",
            Self::TeamNotFound { .. } => "REGISTRY_TEAM_NOT_FOUND",
            Self::NoTeams => "REGISTRY_NO_TEAMS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_rejections_are_recoverable() {
        let transient = [
            PlaceError::RoundNotActive {
                state: RoundState::Waiting,
            },
            PlaceError::InsufficientBits { bits: 0 },
            PlaceError::OnCooldown {
                remaining: Duration::from_millis(50),
            },
        ];
        for error in transient {
            assert!(error.severity().is_recoverable(), "{error}");
        }
    }

    #[test]
    fn unknown_entities_are_validation_errors() {
        let missing = PlaceError::PlayerNotFound {
            player: PlayerId::from("ghost"),
        };
        assert_eq!(missing.severity(), ErrorSeverity::Validation);

        let team = RegistryError::TeamNotFound {
            team: TeamId::from("Nobody"),
        };
        assert_eq!(team.severity(), ErrorSeverity::Validation);
        assert_eq!(team.error_code(), "REGISTRY_TEAM_NOT_FOUND");
    }
}
