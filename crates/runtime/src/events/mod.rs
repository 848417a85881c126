//! Topic-based event bus and wire types for runtime events.
//!
//! Events are published in-process to specific topics, so consumers can
//! subscribe only to what they need. Each event also has a wire envelope and
//! a `game.<type>` subject used by the replicated event log.

mod bus;
mod subject;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use subject::{
    SUBJECT_ROOT, SubjectError, SubjectFilter, subject_for, validate_event_type,
};
pub use types::{
    BitPlacedEvent, CustomEvent, EventEnvelope, PlayerEvent, PlayerEventKind, PlayerUpdateEvent,
    RoundEvent,
};
