use crate::domain::ports::{Scheduler, Ticker};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Fixed-period ticks from `tokio::time`. The first tick fires one period
/// after start.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalScheduler;

impl Scheduler for IntervalScheduler {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        // tokio panics on a zero period
        let period = period.max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Box::new(IntervalTicker { interval })
    }
}

struct IntervalTicker {
    interval: Interval,
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Scheduler whose ticks are fired by hand with [`ManualScheduler::trigger`].
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    sender: Option<UnboundedSender<()>>,
    periods: Vec<Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires one tick. Returns false if no reporter is currently scheduled.
    pub fn trigger(&self) -> bool {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(()).is_ok())
    }

    /// Periods requested by every `ticker` call so far.
    pub fn requested_periods(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .periods
            .clone()
    }
}

impl Scheduler for ManualScheduler {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.sender = Some(sender);
        state.periods.push(period);
        Box::new(ManualTicker { receiver })
    }
}

struct ManualTicker {
    receiver: UnboundedReceiver<()>,
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        if self.receiver.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_after_each_period() {
        let mut ticker = IntervalScheduler.ticker(Duration::from_secs(10));
        let start = Instant::now();

        ticker.tick().await;
        let first = start.elapsed();
        assert!(first >= Duration::from_secs(10) && first < Duration::from_secs(11));

        ticker.tick().await;
        let second = start.elapsed();
        assert!(second >= Duration::from_secs(20) && second < Duration::from_secs(21));
    }

    #[tokio::test]
    async fn test_manual_scheduler_triggers() {
        let scheduler = ManualScheduler::new();
        assert!(!scheduler.trigger());

        let mut ticker = scheduler.ticker(Duration::from_millis(250));
        assert!(scheduler.trigger());
        tokio::time::timeout(Duration::from_secs(1), ticker.tick())
            .await
            .expect("tick should be ready");
        assert_eq!(scheduler.requested_periods(), vec![Duration::from_millis(250)]);
    }
}
