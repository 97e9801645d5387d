use crate::domain::metric::CounterMetric;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Counter that can move in both directions.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, by: i64) {
        self.count.fetch_add(by, Ordering::Relaxed);
    }

    pub fn decrement(&self, by: i64) {
        self.count.fetch_sub(by, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl CounterMetric for Counter {
    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Counter that only grows.
#[derive(Debug, Default)]
pub struct MonotoneCounter {
    count: AtomicU64,
}

impl MonotoneCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, by: u64) {
        self.count.fetch_add(by, Ordering::Relaxed);
    }
}

impl CounterMetric for MonotoneCounter {
    fn count(&self) -> i64 {
        i64::try_from(self.count.load(Ordering::Relaxed)).unwrap_or(i64::MAX)
    }
}
