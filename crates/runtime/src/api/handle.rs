//! Cloneable façade over the running game.
//!
//! [`RuntimeHandle`] exposes the player-facing operations, snapshot queries
//! and event subscriptions. Every mutation takes the state lock once, applies
//! the rule through [`game_core::GameEngine`], marks the state dirty and
//! publishes the resulting events after the lock is released. On a follower
//! runtime every mutation fails with [`RuntimeError::ReadOnly`].
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use game_core::{JoinKind, Placement, Player, PlayerId, Position, RegistryError, Team, TeamId};

use super::errors::{Result, RuntimeError};
use crate::distribution::{EventStream, SnapshotWatcher};
use crate::events::{
    BitPlacedEvent, Event, EventEnvelope, PlayerEvent, PlayerEventKind, PlayerUpdateEvent,
    RoundEvent, SubjectFilter, Topic, validate_event_type,
};
use crate::shared::Shared;
use crate::snapshot::{GameSnapshot, PlayerSnapshot, TeamSnapshot};

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    shared: Arc<Shared>,
}

impl RuntimeHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Adds a player, or reconnects a known one.
    ///
    /// New players land on the least-populated team with a full balance.
    /// Re-adding a connected player changes nothing and emits no event.
    pub async fn add_player(&self, id: &str) -> Result<Player> {
        self.shared.ensure_writable()?;
        let join = {
            let mut game = self.shared.game.write().await;
            let mut engine = game.engine(&self.shared.config);
            let join = engine.add_player(id)?;
            if join.changed() {
                engine.recompute_counts();
                game.touch();
            }
            join
        };

        let kind = match join.kind {
            JoinKind::New => {
                info!("New player {} joined team {}", id, join.player.team_id);
                PlayerEventKind::Joined
            }
            JoinKind::Reconnected => {
                info!("Player {} reconnected to team {}", id, join.player.team_id);
                PlayerEventKind::Reconnected
            }
            JoinKind::AlreadyConnected => return Ok(join.player),
        };

        self.shared
            .publish([Event::Player(PlayerEvent {
                kind,
                player: join.player.id.clone(),
                team: join.player.team_id.clone(),
            })])
            .await;
        Ok(join.player)
    }

    /// Looks up a player and a copy of its team.
    pub async fn player(&self, id: &str) -> Result<(Player, Team)> {
        let game = self.shared.game.read().await;
        game.state
            .find_player(id)
            .map(|(player, team)| (player.clone(), team.clone()))
            .ok_or_else(|| {
                RegistryError::PlayerNotFound {
                    player: PlayerId::from(id),
                }
                .into()
            })
    }

    pub async fn team(&self, id: &str) -> Result<Team> {
        let game = self.shared.game.read().await;
        game.state.team(id).cloned().ok_or_else(|| {
            RegistryError::TeamNotFound {
                team: TeamId::from(id),
            }
            .into()
        })
    }

    /// Marks a player as connected again.
    pub async fn set_player_active(&self, id: &str) -> Result<()> {
        self.set_connected(id, true, PlayerEventKind::Active).await
    }

    /// Marks a player as idle. The player keeps its team and balance.
    pub async fn set_player_idle(&self, id: &str) -> Result<()> {
        self.set_connected(id, false, PlayerEventKind::Idle).await
    }

    /// Disconnects a player. Players are never deleted; a later
    /// [`add_player`](Self::add_player) reconnects them to the same team.
    pub async fn remove_player(&self, id: &str) -> Result<()> {
        self.set_connected(id, false, PlayerEventKind::Left).await
    }

    async fn set_connected(&self, id: &str, connected: bool, kind: PlayerEventKind) -> Result<()> {
        self.shared.ensure_writable()?;
        let change = {
            let mut game = self.shared.game.write().await;
            let mut engine = game.engine(&self.shared.config);
            let change = engine.set_connected(id, connected)?;
            if change.changed {
                engine.recompute_counts();
                game.touch();
            }
            change
        };

        if !change.changed {
            return Ok(());
        }

        info!("Player {} is now {}", id, kind.event_type());
        self.shared
            .publish([Event::Player(PlayerEvent {
                kind,
                player: change.player,
                team: change.team,
            })])
            .await;
        Ok(())
    }

    /// Claims the cell at `(x, y)` for the player's team.
    ///
    /// Returns `Ok(true)` when accepted, including the free claim of a cell
    /// the team already owns. Rejections come back as typed errors; check
    /// [`RuntimeError::is_recoverable`] to tell "not right now" apart from
    /// invalid input.
    pub async fn place_bit(&self, id: &str, x: i32, y: i32) -> Result<bool> {
        self.shared.ensure_writable()?;
        let position = Position::new(x, y);
        let now = self.shared.clock.now();

        let placement = {
            let mut game = self.shared.game.write().await;
            let placement = game
                .engine(&self.shared.config)
                .place_bit(id, position, now)?;
            if placement.changed() {
                game.touch();
            }
            placement
        };

        if let Placement::Claimed(claim) = placement {
            debug!(
                "Player {} claimed {} for {} ({} bits left)",
                claim.player, claim.position, claim.team, claim.bits_left
            );
            self.shared
                .publish([Event::Territory(BitPlacedEvent {
                    player: claim.player,
                    team: claim.team,
                    position: claim.position,
                    previous_owner: claim.previous_owner,
                })])
                .await;
        }
        Ok(true)
    }

    /// Forces the pending round to start now.
    ///
    /// Returns `Ok(false)` if no round is waiting to start.
    pub async fn start_round(&self) -> Result<bool> {
        self.shared.ensure_writable()?;
        let started = {
            let mut game = self.shared.game.write().await;
            let started = game.engine(&self.shared.config).start_round().is_some();
            if started {
                game.touch();
            }
            started
        };

        if started {
            info!("Round started early");
            self.shared
                .publish([Event::Round(RoundEvent::Started)])
                .await;
        }
        Ok(started)
    }

    /// Publishes the full record of one player and its team on
    /// `game.player_update`.
    pub async fn broadcast_player_update(&self, id: &str) -> Result<()> {
        let event = {
            let game = self.shared.game.read().await;
            let (player, team) = game.state.find_player(id).ok_or_else(|| {
                RegistryError::PlayerNotFound {
                    player: PlayerId::from(id),
                }
            })?;
            Event::PlayerUpdate(PlayerUpdateEvent {
                player: PlayerSnapshot::from(player),
                team: TeamSnapshot::from(team),
            })
        };

        self.shared.publish([event]).await;
        Ok(())
    }

    /// Publishes the full record of one team on `game.team_update`.
    pub async fn broadcast_team_update(&self, id: &str) -> Result<()> {
        let event = {
            let game = self.shared.game.read().await;
            let team = game.state.team(id).ok_or_else(|| RegistryError::TeamNotFound {
                team: TeamId::from(id),
            })?;
            Event::TeamUpdate(TeamSnapshot::from(team))
        };

        self.shared.publish([event]).await;
        Ok(())
    }

    /// Current state as a deep, independent snapshot.
    pub async fn game_state(&self) -> GameSnapshot {
        self.shared.snapshot().await
    }

    /// Follows broadcast snapshots, starting with the next change.
    ///
    /// With a replicated distribution this follows the shared store, so
    /// changes written by another instance are observed too.
    pub fn watch_game_state(&self) -> Result<SnapshotWatcher> {
        match self.shared.distribution.watch()? {
            Some(watcher) => Ok(watcher),
            None => Ok(SnapshotWatcher::local(self.shared.snapshots.subscribe())),
        }
    }

    /// Publishes an externally defined event on `game.<event_type>`.
    pub async fn publish_event(&self, event_type: &str, payload: Value) -> Result<()> {
        validate_event_type(event_type)?;
        self.shared
            .publish([Event::custom(event_type, payload)])
            .await;
        Ok(())
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Player` - Joins, reconnects, leaves, idle/active flips
    /// - `Topic::Territory` - Bit placements
    /// - `Topic::Round` - Round started/finished/reset
    /// - `Topic::Custom` - Events published through [`publish_event`](Self::publish_event)
    /// - `Topic::Update` - Player and team records from the `broadcast_*_update` calls
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// let mut rounds = handle.subscribe(Topic::Round);
    /// while let Ok(event) = rounds.recv().await {
    ///     // Handle round events
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe(topic)
    }

    /// Streams event envelopes whose subject matches `filter`.
    ///
    /// Reads the shared event log when the distribution has one, and the
    /// in-process bus otherwise.
    pub fn event_stream(&self, filter: SubjectFilter) -> EventStream {
        match self.shared.distribution.subscribe_events(filter.clone()) {
            Some(stream) => stream,
            None => EventStream::from_bus(self.shared.bus.subscribe_all(), filter),
        }
    }

    /// Invokes `handler` for every matching event on a background task.
    ///
    /// The task ends when the event source closes; abort the returned
    /// handle to unsubscribe earlier.
    pub fn subscribe_events<F>(&self, filter: SubjectFilter, handler: F) -> JoinHandle<()>
    where
        F: Fn(EventEnvelope) + Send + 'static,
    {
        let mut stream = self.event_stream(filter);
        tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Ok(envelope) => handler(envelope),
                    Err(RuntimeError::WatchClosed) => break,
                    Err(err) => warn!("Skipping undecodable event: {}", err),
                }
            }
            debug!("Event subscription on {} ended", stream.filter());
        })
    }

    /// Name of the active distribution, for diagnostics.
    pub fn distribution_name(&self) -> &'static str {
        self.shared.distribution.name()
    }
}
