use std::time::Duration;
use tokio::time::{interval_at, timeout_at, Instant, Interval, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Fixed-rate ticker anchored at its creation instant.
///
/// Tick `n` is due at `start + n * period`. A tick that is already late fires once immediately;
/// ticks missed entirely are dropped and later ticks stay on the grid.
pub(crate) struct Timer {
    interval: Interval,
    start: Instant,
    period: Duration,
}

impl Timer {
    pub fn new(period: Duration) -> Self {
        let start = Instant::now();
        let mut interval = interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            start,
            period,
        }
    }

    /// Wait for the next due tick and return the time elapsed since the timer started.
    pub async fn tick(&mut self) -> Duration {
        self.interval.tick().await;
        self.start.elapsed()
    }

    /// Like [`tick`](Self::tick), but gives up once `limit` has elapsed since the timer started.
    /// Returns `None` if the next tick is not due before `limit`.
    pub async fn tick_within(&mut self, limit: Duration) -> Option<Duration> {
        let offset = match self.start.checked_add(limit) {
            Some(deadline) => {
                timeout_at(deadline, self.interval.tick()).await.ok()?;
                self.start.elapsed()
            }
            None => self.tick().await,
        };
        (offset < limit).then_some(offset)
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.period))
    }
}
