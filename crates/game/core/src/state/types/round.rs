use std::fmt;

/// Phase of the round cycle.
///
/// The only legal transitions are `Waiting → InProgress → Finished → Waiting`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoundState {
    /// Countdown before the next round.
    #[default]
    Waiting,
    /// Round running; placements and regeneration are live.
    #[cfg_attr(feature = "serde", serde(rename = "In Progress"))]
    InProgress,
    /// Round over, winner decided, waiting for the reset.
    Finished,
}

impl RoundState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::InProgress => "In Progress",
            Self::Finished => "Finished",
        }
    }

    /// Check if placements are accepted.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_display() {
        for state in [RoundState::Waiting, RoundState::InProgress, RoundState::Finished] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
            assert_eq!(serde_json::from_str::<RoundState>(&json).unwrap(), state);
        }
    }
}
