use super::histogram::Histogram;
use super::meter::Meter;
use crate::domain::metric::{
    DistributionSnapshot, HistogramMetric, MeterMetric, RateSnapshot, TimerMetric,
};
use std::time::{Duration, Instant};

/// Default bucket upper bounds in nanoseconds, 100µs to 10s.
pub const DEFAULT_TIMER_BUCKETS: [f64; 11] = [
    100_000.0,
    500_000.0,
    1_000_000.0,
    5_000_000.0,
    10_000_000.0,
    50_000_000.0,
    100_000_000.0,
    250_000_000.0,
    500_000_000.0,
    1_000_000_000.0,
    10_000_000_000.0,
];

/// Duration histogram in nanoseconds combined with a call-rate meter.
#[derive(Debug)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_TIMER_BUCKETS.to_vec())
    }

    /// Bucket bounds are in nanoseconds.
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        Self {
            histogram: Histogram::with_buckets(buckets),
            meter: Meter::new(),
        }
    }

    pub fn update(&self, elapsed: Duration) {
        self.histogram.update(elapsed.as_nanos() as f64);
        self.meter.mark(1);
    }

    /// Runs `f` and records how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = f();
        self.update(started.elapsed());
        result
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerMetric for Timer {
    fn snapshot(&self) -> (DistributionSnapshot, RateSnapshot) {
        (self.histogram.snapshot(), self.meter.rates())
    }

    fn buckets(&self) -> Vec<f64> {
        self.histogram.buckets()
    }
}
