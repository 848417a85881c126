//! Wall-clock anchored, monotonic time source for the runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use game_core::Timestamp;
use tokio::time::Instant;

/// Millisecond clock shared by the handle and the scheduler.
///
/// Readings are the Unix time at construction plus the elapsed time of a
/// [`tokio::time::Instant`], so they never go backwards and follow tokio's
/// paused clock in tests.
#[derive(Clone, Debug)]
pub struct Clock {
    inner: Arc<ClockInner>,
}

#[derive(Debug)]
struct ClockInner {
    origin: Instant,
    epoch_millis: u64,
    last_stamp: AtomicU64,
}

impl Clock {
    pub fn new() -> Self {
        let epoch_millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        Self::starting_at(epoch_millis)
    }

    /// Creates a clock whose first reading is `epoch_millis`.
    pub fn starting_at(epoch_millis: u64) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                origin: Instant::now(),
                epoch_millis,
                last_stamp: AtomicU64::new(0),
            }),
        }
    }

    pub fn now_millis(&self) -> u64 {
        let elapsed = u64::try_from(self.inner.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.inner.epoch_millis.saturating_add(elapsed)
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_millis())
    }

    /// Returns a snapshot timestamp strictly greater than every previous one.
    pub fn next_stamp(&self) -> u64 {
        let now = self.now_millis();
        let previous = self
            .inner
            .last_stamp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn follows_tokio_time() {
        let clock = Clock::starting_at(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(clock.now(), Timestamp::from_millis(1_250));
    }

    #[tokio::test(start_paused = true)]
    async fn stamps_strictly_increase_without_time_passing() {
        let clock = Clock::starting_at(5_000);
        let first = clock.next_stamp();
        let second = clock.next_stamp();
        let third = clock.next_stamp();

        assert_eq!(first, 5_000);
        assert!(first < second && second < third);
    }
}
