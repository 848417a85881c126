use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use super::Timestamp;

/// Identifier of a team. Ordering is plain string ordering, which is what
/// tie-breaks and team iteration rely on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TeamId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for TeamId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a player, assigned by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for PlayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub team_id: TeamId,
    /// Always the team color.
    pub color: String,
    /// Current balance, kept within `[0, max_bits]`.
    pub bits: u32,
    /// Time of the last consuming placement. `None` means the player has
    /// never spent a bit and may act immediately.
    pub last_action_at: Option<Timestamp>,
    pub connected: bool,
}

impl Player {
    pub fn new(id: PlayerId, team: &Team, bits: u32) -> Self {
        Self {
            id,
            team_id: team.id.clone(),
            color: team.color.clone(),
            bits,
            last_action_at: None,
            connected: true,
        }
    }
}

/// A team and the players assigned to it.
///
/// `score` mirrors the number of cells the team owns; `percentage` is that
/// score relative to the grid area. Both are maintained incrementally by the
/// territory engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub color: String,
    pub score: u32,
    pub percentage: f32,
    pub active_count: u32,
    pub idle_count: u32,
    pub players: BTreeMap<PlayerId, Player>,
}

impl Team {
    pub fn new(id: TeamId, color: impl Into<String>) -> Self {
        Self {
            id,
            color: color.into(),
            score: 0,
            percentage: 0.0,
            active_count: 0,
            idle_count: 0,
            players: BTreeMap::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.players.len()
    }

    /// Recounts connected and disconnected members.
    pub fn recount(&mut self) {
        let active = self.players.values().filter(|p| p.connected).count() as u32;
        self.active_count = active;
        self.idle_count = self.players.len() as u32 - active;
    }
}
