//! In-process metric registry.
//!
//! Metrics are registered once under a unique identity and updated by the
//! application through the returned handles; the reporter reads them through
//! the `MetricRegistry` port.

pub mod counter;
pub mod gauge;
pub mod histogram;
pub mod meter;
pub mod timer;

pub use counter::{Counter, MonotoneCounter};
pub use gauge::{CallbackGauge, ValueGauge};
pub use histogram::Histogram;
pub use meter::Meter;
pub use timer::Timer;

use crate::domain::identity::MetricIdentity;
use crate::domain::metric::{MetricHandle, RegisteredMetric};
use crate::domain::ports::MetricRegistry;
use anyhow::{Result, bail};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    metrics: RwLock<Vec<RegisteredMetric>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a metric. Identities must be unique.
    pub fn register(&self, identity: MetricIdentity, handle: MetricHandle) -> Result<()> {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        if metrics.iter().any(|m| m.identity == identity) {
            bail!("Metric {} is already registered", identity.qualified_name());
        }
        debug!(
            "InMemoryRegistry: registered {:?} {}",
            handle.kind(),
            identity.qualified_name()
        );
        metrics.push(RegisteredMetric::new(identity, handle));
        Ok(())
    }

    /// Removes a metric, returning whether it was present.
    pub fn remove(&self, identity: &MetricIdentity) -> bool {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        let before = metrics.len();
        metrics.retain(|m| &m.identity != identity);
        metrics.len() != before
    }

    pub fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counter(&self, identity: MetricIdentity) -> Result<Arc<Counter>> {
        let counter = Arc::new(Counter::new());
        self.register(identity, MetricHandle::Counter(counter.clone()))?;
        Ok(counter)
    }

    pub fn monotone_counter(&self, identity: MetricIdentity) -> Result<Arc<MonotoneCounter>> {
        let counter = Arc::new(MonotoneCounter::new());
        self.register(identity, MetricHandle::MonotoneCounter(counter.clone()))?;
        Ok(counter)
    }

    pub fn gauge(&self, identity: MetricIdentity) -> Result<Arc<ValueGauge>> {
        let gauge = Arc::new(ValueGauge::new());
        self.register(identity, MetricHandle::Gauge(gauge.clone()))?;
        Ok(gauge)
    }

    pub fn callback_gauge<F>(&self, identity: MetricIdentity, read: F) -> Result<Arc<CallbackGauge>>
    where
        F: Fn() -> Result<Option<serde_json::Value>> + Send + Sync + 'static,
    {
        let gauge = Arc::new(CallbackGauge::new(read));
        self.register(identity, MetricHandle::Gauge(gauge.clone()))?;
        Ok(gauge)
    }

    /// Registers a histogram; `None` uses the default bucket bounds.
    pub fn histogram(
        &self,
        identity: MetricIdentity,
        buckets: Option<Vec<f64>>,
    ) -> Result<Arc<Histogram>> {
        let histogram = Arc::new(match buckets {
            Some(buckets) => Histogram::with_buckets(buckets),
            None => Histogram::new(),
        });
        self.register(identity, MetricHandle::Histogram(histogram.clone()))?;
        Ok(histogram)
    }

    pub fn meter(&self, identity: MetricIdentity) -> Result<Arc<Meter>> {
        let meter = Arc::new(Meter::new());
        self.register(identity, MetricHandle::Meter(meter.clone()))?;
        Ok(meter)
    }

    /// Registers a timer; bucket bounds are in nanoseconds.
    pub fn timer(&self, identity: MetricIdentity, buckets: Option<Vec<f64>>) -> Result<Arc<Timer>> {
        let timer = Arc::new(match buckets {
            Some(buckets) => Timer::with_buckets(buckets),
            None => Timer::new(),
        });
        self.register(identity, MetricHandle::Timer(timer.clone()))?;
        Ok(timer)
    }
}

impl MetricRegistry for InMemoryRegistry {
    fn list_metrics(&self) -> Vec<RegisteredMetric> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kind::MetricKind;

    #[test]
    fn test_register_and_list() {
        let registry = InMemoryRegistry::new();
        let requests = registry.counter(MetricIdentity::new("requests")).unwrap();
        registry
            .timer(MetricIdentity::new("latency").with_group("http"), None)
            .unwrap();
        requests.increment(3);

        let listed = registry.list_metrics();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind(), MetricKind::Counter);
        assert_eq!(listed[1].kind(), MetricKind::Timer);
        assert_eq!(listed[1].identity.qualified_name(), "http.latency");
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let registry = InMemoryRegistry::new();
        let identity = MetricIdentity::new("jobs").with_tag("queue", "high");
        registry.counter(identity.clone()).unwrap();

        assert!(registry.meter(identity.clone()).is_err());
        // Same name with different tags is a different metric.
        assert!(registry.meter(MetricIdentity::new("jobs")).is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove() {
        let registry = InMemoryRegistry::new();
        let identity = MetricIdentity::new("temp");
        registry.gauge(identity.clone()).unwrap();

        assert!(registry.remove(&identity));
        assert!(!registry.remove(&identity));
        assert!(registry.is_empty());
    }
}
