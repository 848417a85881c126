//! Typed domain events and their wire envelope.

use game_core::{CellOwner, PlayerId, Position, TeamId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::snapshot::{PlayerSnapshot, TeamSnapshot};

/// Connection-related changes to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEventKind {
    Joined,
    Reconnected,
    Left,
    Idle,
    Active,
}

impl PlayerEventKind {
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Joined => "player_join",
            Self::Reconnected => "player_reconnect",
            Self::Left => "player_leave",
            Self::Idle => "player_idle",
            Self::Active => "player_active",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub kind: PlayerEventKind,
    pub player: PlayerId,
    pub team: TeamId,
}

/// A cell changed hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitPlacedEvent {
    pub player: PlayerId,
    pub team: TeamId,
    pub position: Position,
    pub previous_owner: CellOwner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEvent {
    Started,
    Finished { winner: Option<TeamId> },
    Reset,
}

impl RoundEvent {
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Started => "round_started",
            Self::Finished { .. } => "round_finished",
            Self::Reset => "round_reset",
        }
    }
}

/// Full record of one player alongside its team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdateEvent {
    pub player: PlayerSnapshot,
    pub team: TeamSnapshot,
}

/// Event published by an external collaborator through the handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub event_type: String,
    pub payload: Value,
}

/// Wire form of an event, as stored in the event log and handed to
/// subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default)]
    pub data: Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl EventEnvelope {
    /// Subject the envelope is published on, `game.<type>`.
    pub fn subject(&self) -> String {
        super::subject_for(&self.event_type)
    }
}

pub(super) fn player_data(player: &PlayerId, team: &TeamId) -> Value {
    json!({ "playerId": player, "teamId": team })
}

pub(super) fn bit_placed_data(event: &BitPlacedEvent) -> Value {
    json!({
        "playerId": event.player,
        "teamId": event.team,
        "x": event.position.x,
        "y": event.position.y,
        "oldOwner": event.previous_owner,
    })
}

pub(super) fn round_data(event: &RoundEvent) -> Value {
    match event {
        RoundEvent::Finished { winner } => json!({ "winner": winner }),
        RoundEvent::Started | RoundEvent::Reset => Value::Null,
    }
}

pub(super) fn player_update_data(event: &PlayerUpdateEvent) -> Value {
    json!({ "player": event.player, "team": event.team })
}

pub(super) fn team_update_data(team: &TeamSnapshot) -> Value {
    json!(team)
}
