use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Discrete grid position expressed in cell coordinates.
///
/// The canonical text form is `"x:y"`, which is also the key used by
/// serialized snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Renders the `"x:y"` key form.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Failure to parse an `"x:y"` key.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid position key `{0}`, expected `x:y`")]
pub struct ParsePositionError(pub String);

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(':')
            .ok_or_else(|| ParsePositionError(s.to_string()))?;
        let x = x.parse().map_err(|_| ParsePositionError(s.to_string()))?;
        let y = y.parse().map_err(|_| ParsePositionError(s.to_string()))?;
        Ok(Self { x, y })
    }
}

/// Millisecond timestamp on the engine's monotonic clock.
///
/// The engine never reads a clock itself; callers pass `now` into every
/// time-dependent operation, which keeps the rules deterministic under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` lies in the future.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_key_round_trips() {
        let pos = Position::new(3, 17);
        assert_eq!(pos.key(), "3:17");
        assert_eq!("3:17".parse::<Position>().unwrap(), pos);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("3-17".parse::<Position>().is_err());
        assert!("a:1".parse::<Position>().is_err());
        assert!(":".parse::<Position>().is_err());
    }

    #[test]
    fn elapsed_saturates() {
        let early = Timestamp(100);
        let late = Timestamp(350);
        assert_eq!(late.saturating_since(early), Duration::from_millis(250));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }
}
