//! Read-side view of registry metrics.
//!
//! The registry owns storage and statistics; the reporter only reads through
//! these traits. Each `snapshot`/`rates` call must return fields that describe
//! the same logical instant.

use crate::domain::identity::MetricIdentity;
use crate::domain::kind::MetricKind;
use std::fmt;
use std::sync::Arc;

pub trait CounterMetric: Send + Sync {
    fn count(&self) -> i64;
}

pub trait GaugeMetric: Send + Sync {
    /// Current gauge value. `Ok(None)` means the gauge has nothing to report.
    fn value(&self) -> anyhow::Result<Option<serde_json::Value>>;
}

/// Precomputed distribution statistics of a histogram or timer.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSnapshot {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
    pub p999: f64,
    /// Non-cumulative counts per bucket, keyed by upper bound.
    pub bucket_counts: Vec<(f64, u64)>,
}

/// Exponentially weighted throughput of a meter or timer.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub count: u64,
    pub mean_rate: f64,
    pub m1_rate: f64,
    pub m5_rate: f64,
    pub m15_rate: f64,
}

pub trait HistogramMetric: Send + Sync {
    fn snapshot(&self) -> DistributionSnapshot;
    /// Configured bucket upper bounds.
    fn buckets(&self) -> Vec<f64>;
}

pub trait MeterMetric: Send + Sync {
    fn rates(&self) -> RateSnapshot;
}

pub trait TimerMetric: Send + Sync {
    /// Distribution and throughput read together.
    fn snapshot(&self) -> (DistributionSnapshot, RateSnapshot);
    fn buckets(&self) -> Vec<f64>;
}

/// Live reference to a registered metric, tagged by kind.
#[derive(Clone)]
pub enum MetricHandle {
    Counter(Arc<dyn CounterMetric>),
    MonotoneCounter(Arc<dyn CounterMetric>),
    Gauge(Arc<dyn GaugeMetric>),
    Histogram(Arc<dyn HistogramMetric>),
    Meter(Arc<dyn MeterMetric>),
    Timer(Arc<dyn TimerMetric>),
}

impl MetricHandle {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricHandle::Counter(_) => MetricKind::Counter,
            MetricHandle::MonotoneCounter(_) => MetricKind::MonotoneCounter,
            MetricHandle::Gauge(_) => MetricKind::Gauge,
            MetricHandle::Histogram(_) => MetricKind::Histogram,
            MetricHandle::Meter(_) => MetricKind::Meter,
            MetricHandle::Timer(_) => MetricKind::Timer,
        }
    }
}

impl fmt::Debug for MetricHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetricHandle::{:?}", self.kind())
    }
}

/// One entry returned by a registry listing.
#[derive(Debug, Clone)]
pub struct RegisteredMetric {
    pub identity: MetricIdentity,
    pub handle: MetricHandle,
}

impl RegisteredMetric {
    pub fn new(identity: MetricIdentity, handle: MetricHandle) -> Self {
        Self { identity, handle }
    }

    pub fn kind(&self) -> MetricKind {
        self.handle.kind()
    }
}
