//! Topic-based event bus implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use super::types::{
    self, BitPlacedEvent, CustomEvent, EventEnvelope, PlayerEvent, PlayerUpdateEvent, RoundEvent,
};
use crate::snapshot::TeamSnapshot;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Joins, reconnects, leaves and idle/active flips
    Player,
    /// Cell ownership changes
    Territory,
    /// Round lifecycle
    Round,
    /// Events published by external collaborators
    Custom,
    /// Full player and team records pushed on request
    Update,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Player,
        Topic::Territory,
        Topic::Round,
        Topic::Custom,
        Topic::Update,
    ];

    const fn index(self) -> usize {
        match self {
            Topic::Player => 0,
            Topic::Territory => 1,
            Topic::Round => 2,
            Topic::Custom => 3,
            Topic::Update => 4,
        }
    }
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Player(PlayerEvent),
    Territory(BitPlacedEvent),
    Round(RoundEvent),
    Custom(CustomEvent),
    PlayerUpdate(PlayerUpdateEvent),
    TeamUpdate(TeamSnapshot),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Player(_) => Topic::Player,
            Event::Territory(_) => Topic::Territory,
            Event::Round(_) => Topic::Round,
            Event::Custom(_) => Topic::Custom,
            Event::PlayerUpdate(_) | Event::TeamUpdate(_) => Topic::Update,
        }
    }

    /// Wire name of the event, e.g. `bit_placed`.
    pub fn event_type(&self) -> &str {
        match self {
            Event::Player(event) => event.kind.event_type(),
            Event::Territory(_) => "bit_placed",
            Event::Round(event) => event.event_type(),
            Event::Custom(event) => &event.event_type,
            Event::PlayerUpdate(_) => "player_update",
            Event::TeamUpdate(_) => "team_update",
        }
    }

    pub fn subject(&self) -> String {
        super::subject_for(self.event_type())
    }

    /// Builds the wire envelope, stamped with `timestamp` (ms since epoch).
    pub fn envelope(&self, timestamp: u64) -> EventEnvelope {
        let (player_id, team_id, data) = match self {
            Event::Player(event) => (
                Some(event.player.to_string()),
                Some(event.team.to_string()),
                types::player_data(&event.player, &event.team),
            ),
            Event::Territory(event) => (
                Some(event.player.to_string()),
                Some(event.team.to_string()),
                types::bit_placed_data(event),
            ),
            Event::Round(event) => (None, None, types::round_data(event)),
            Event::Custom(event) => (None, None, event.payload.clone()),
            Event::PlayerUpdate(event) => (
                Some(event.player.id.clone()),
                Some(event.team.id.clone()),
                types::player_update_data(event),
            ),
            Event::TeamUpdate(team) => (None, Some(team.id.clone()), types::team_update_data(team)),
        };

        EventEnvelope {
            event_type: self.event_type().to_string(),
            player_id,
            team_id,
            data,
            timestamp,
        }
    }

    /// Wraps an external event.
    pub fn custom(event_type: impl Into<String>, payload: Value) -> Self {
        Event::Custom(CustomEvent {
            event_type: event_type.into(),
            payload,
        })
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about, or to every topic at once as wire envelopes.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<[broadcast::Sender<Event>; 5]>,
    all: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Topic::ALL.map(|_| broadcast::channel(capacity).0)),
            all: broadcast::channel(capacity * Topic::ALL.len()).0,
        }
    }

    /// Publish an event to its corresponding topic
    ///
    /// Returns the envelope stamped with `timestamp`, the same one every
    /// [`subscribe_all`](Self::subscribe_all) receiver gets.
    pub fn publish(&self, event: Event, timestamp: u64) -> EventEnvelope {
        let topic = event.topic();
        let envelope = event.envelope(timestamp);

        if self.channels[topic.index()].send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
        let _ = self.all.send(envelope.clone());
        envelope
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels[topic.index()].subscribe()
    }

    /// Subscribe to every topic through a single receiver.
    pub fn subscribe_all(&self) -> broadcast::Receiver<EventEnvelope> {
        self.all.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
