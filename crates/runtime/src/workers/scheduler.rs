//! Tick loop driving rounds, bit regeneration and snapshot broadcasts.
//!
//! Three independent intervals share one `select!` loop, so ticks never run
//! concurrently with each other; handle operations interleave with them
//! through the state lock. Missed ticks are skipped rather than replayed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace, warn};

use game_core::{GameConfig, RoundTransition};

use crate::events::{Event, RoundEvent};
use crate::shared::Shared;

pub(crate) struct Scheduler {
    shared: Arc<Shared>,
    broadcast_interval: Duration,
}

impl Scheduler {
    pub(crate) fn new(shared: Arc<Shared>, broadcast_interval: Duration) -> Self {
        Self {
            shared,
            broadcast_interval,
        }
    }

    /// Main worker loop. Returns once `stop` fires or its sender is dropped.
    pub(crate) async fn run(self, mut stop: oneshot::Receiver<()>) {
        let start = Instant::now();
        let mut round = ticker(start, GameConfig::ROUND_TICK);
        let mut regen = ticker(start, self.shared.config.regen_interval);
        let mut broadcast = ticker(start, self.broadcast_interval);

        info!(
            "Scheduler started (regen every {:?}, broadcast every {:?})",
            self.shared.config.regen_interval, self.broadcast_interval
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = round.tick() => self.on_round_tick().await,
                _ = regen.tick() => self.on_regen_tick().await,
                _ = broadcast.tick() => self.on_broadcast_tick().await,
            }
        }

        // Flush whatever is pending so observers end on the final state.
        self.on_broadcast_tick().await;
        info!("Scheduler stopped");
    }

    async fn on_round_tick(&self) {
        let transition = {
            let mut game = self.shared.game.write().await;
            let transition = game.engine(&self.shared.config).tick_round();
            game.touch();
            transition
        };

        let Some(transition) = transition else {
            return;
        };

        let event = match transition {
            RoundTransition::Started => {
                info!("Round started");
                RoundEvent::Started
            }
            RoundTransition::Finished { winner } => {
                match &winner {
                    Some(team) => info!("Round finished, winner: {}", team),
                    None => info!("Round finished without a winner"),
                }
                RoundEvent::Finished { winner }
            }
            RoundTransition::Reset => {
                info!("Board reset, next round countdown started");
                RoundEvent::Reset
            }
        };
        self.shared.publish([Event::Round(event)]).await;
    }

    async fn on_regen_tick(&self) {
        let mut game = self.shared.game.write().await;
        if !game.state.round_state.is_active() {
            return;
        }

        let credited = game.engine(&self.shared.config).regenerate_bits();
        if credited > 0 {
            game.touch();
        }
        trace!("Regenerated bits for {} players", credited);
    }

    async fn on_broadcast_tick(&self) {
        let snapshot = {
            let mut game = self.shared.game.write().await;
            if !game.dirty {
                return;
            }
            game.dirty = false;
            Arc::new(game.capture(self.shared.clock.next_stamp()))
        };

        self.shared.snapshots.send_replace(Arc::clone(&snapshot));

        match self.shared.distribution.save_snapshot(&snapshot).await {
            Ok(()) => debug!("Broadcast snapshot v{}", snapshot.version),
            // Retried on the next dirty broadcast.
            Err(err) => warn!("Failed to persist snapshot v{}: {}", snapshot.version, err),
        }
    }
}

fn ticker(start: Instant, period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut interval = interval_at(start + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
