//! Game configuration constants and tunable parameters.
use std::time::Duration;

/// Which players receive bits on the economy tick.
///
/// The rule is applied uniformly to every player; there is no per-team or
/// per-round override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegenPolicy {
    /// Every registered player regenerates, connected or not.
    #[default]
    AllPlayers,
    /// Only players whose connection flag is set regenerate.
    ConnectedOnly,
}

/// Static description of one team in the fixed roster.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamSpec {
    pub id: String,
    pub color: String,
}

impl TeamSpec {
    pub fn new(id: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
        }
    }
}

/// Game configuration: grid bounds, economy and round timing.
///
/// The engine depends on these values but never loads them itself; callers
/// build a config (usually [`GameConfig::default`]) and hand it over at
/// construction time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    /// Upper bound of a player's bit balance.
    pub max_bits: u32,
    /// Bits granted per economy tick.
    pub bits_per_tick: u32,
    /// Period of the economy tick.
    pub regen_interval: Duration,
    /// Minimum time between two consuming placements by the same player.
    pub action_cooldown: Duration,
    pub round_duration: Duration,
    pub post_round_delay: Duration,
    pub pre_round_countdown: Duration,
    pub regen_policy: RegenPolicy,
    pub teams: Vec<TeamSpec>,
}

impl GameConfig {
    // ===== fixed engine constants =====
    /// Step applied to round timers on every round tick.
    pub const ROUND_TICK: Duration = Duration::from_secs(1);
    pub const NEUTRAL_OWNER: &'static str = "neutral";
    pub const NEUTRAL_COLOR: &'static str = "#374151";
    /// Largest accepted grid width or height.
    pub const MAX_GRID_SIDE: u32 = 1024;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_GRID_WIDTH: u32 = 40;
    pub const DEFAULT_GRID_HEIGHT: u32 = 25;
    pub const DEFAULT_MAX_BITS: u32 = 10;
    pub const DEFAULT_BITS_PER_TICK: u32 = 1;
    pub const DEFAULT_REGEN_INTERVAL: Duration = Duration::from_secs(4);
    pub const DEFAULT_ACTION_COOLDOWN: Duration = Duration::from_millis(200);
    pub const DEFAULT_ROUND_DURATION: Duration = Duration::from_secs(180);
    pub const DEFAULT_POST_ROUND_DELAY: Duration = Duration::from_secs(10);
    pub const DEFAULT_PRE_ROUND_COUNTDOWN: Duration = Duration::from_secs(5);

    pub fn new() -> Self {
        Self {
            grid_width: Self::DEFAULT_GRID_WIDTH,
            grid_height: Self::DEFAULT_GRID_HEIGHT,
            max_bits: Self::DEFAULT_MAX_BITS,
            bits_per_tick: Self::DEFAULT_BITS_PER_TICK,
            regen_interval: Self::DEFAULT_REGEN_INTERVAL,
            action_cooldown: Self::DEFAULT_ACTION_COOLDOWN,
            round_duration: Self::DEFAULT_ROUND_DURATION,
            post_round_delay: Self::DEFAULT_POST_ROUND_DELAY,
            pre_round_countdown: Self::DEFAULT_PRE_ROUND_COUNTDOWN,
            regen_policy: RegenPolicy::default(),
            teams: Self::default_teams(),
        }
    }

    /// The four-team roster every game starts with.
    pub fn default_teams() -> Vec<TeamSpec> {
        vec![
            TeamSpec::new("Glitchbyte", "#d500f9"),
            TeamSpec::new("Nullwave", "#00bcd4"),
            TeamSpec::new("Overburn", "#e91e63"),
            TeamSpec::new("Voltcrash", "#76ff03"),
        ]
    }

    pub fn with_grid(mut self, width: u32, height: u32) -> Self {
        self.grid_width = width;
        self.grid_height = height;
        self
    }

    pub fn with_regen_policy(mut self, policy: RegenPolicy) -> Self {
        self.regen_policy = policy;
        self
    }

    pub fn with_teams(mut self, teams: Vec<TeamSpec>) -> Self {
        self.teams = teams;
        self
    }

    pub fn with_action_cooldown(mut self, cooldown: Duration) -> Self {
        self.action_cooldown = cooldown;
        self
    }

    pub fn with_round_timing(
        mut self,
        pre_round_countdown: Duration,
        round_duration: Duration,
        post_round_delay: Duration,
    ) -> Self {
        self.pre_round_countdown = pre_round_countdown;
        self.round_duration = round_duration;
        self.post_round_delay = post_round_delay;
        self
    }

    /// Total number of cells on the grid, saturating at `u32::MAX`.
    pub fn grid_area(&self) -> u32 {
        self.grid_width.saturating_mul(self.grid_height)
    }

    /// Share of the grid covered by `score` cells, in percent.
    pub fn percentage_of(&self, score: u32) -> f32 {
        let area = self.grid_area();
        if area == 0 {
            return 0.0;
        }
        (score as f32 * 100.0) / area as f32
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_area_saturates() {
        let config = GameConfig::new().with_grid(u32::MAX, 2);
        assert_eq!(config.grid_area(), u32::MAX);
        assert!(config.percentage_of(1) < 0.001);
    }

    #[test]
    fn percentage_of_empty_grid_is_zero() {
        let config = GameConfig::new().with_grid(0, 25);
        assert_eq!(config.percentage_of(10), 0.0);
    }
}
