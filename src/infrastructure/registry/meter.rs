use crate::domain::metric::{MeterMetric, RateSnapshot};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Decay step of the moving averages.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Exponentially weighted moving average of events per second.
#[derive(Debug, Clone)]
struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: u64,
    initialized: bool,
}

impl Ewma {
    fn over_minutes(minutes: f64) -> Self {
        let alpha = 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / minutes).exp();
        Self {
            alpha,
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct MeterState {
    count: u64,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterState {
    /// Applies every decay step that elapsed before `now`.
    fn catch_up(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = elapsed.as_nanos() / TICK_INTERVAL.as_nanos();
        for _ in 0..ticks {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
        self.last_tick += TICK_INTERVAL * ticks as u32;
    }
}

/// Throughput meter with 1, 5 and 15 minute moving averages.
#[derive(Debug)]
pub struct Meter {
    started: Instant,
    state: Mutex<MeterState>,
}

impl Meter {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            started,
            state: Mutex::new(MeterState {
                count: 0,
                last_tick: started,
                m1: Ewma::over_minutes(1.0),
                m5: Ewma::over_minutes(5.0),
                m15: Ewma::over_minutes(15.0),
            }),
        }
    }

    pub fn mark(&self, events: u64) {
        self.mark_at(events, Instant::now());
    }

    pub fn mark_at(&self, events: u64, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.catch_up(now);
        state.count += events;
        state.m1.uncounted += events;
        state.m5.uncounted += events;
        state.m15.uncounted += events;
    }

    pub fn rates_at(&self, now: Instant) -> RateSnapshot {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.catch_up(now);

        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let mean_rate = if elapsed > 0.0 {
            state.count as f64 / elapsed
        } else {
            0.0
        };

        RateSnapshot {
            count: state.count,
            mean_rate,
            m1_rate: state.m1.rate,
            m5_rate: state.m5.rate,
            m15_rate: state.m15.rate,
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterMetric for Meter {
    fn rates(&self) -> RateSnapshot {
        self.rates_at(Instant::now())
    }
}
