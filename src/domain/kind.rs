use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a registered metric. Fixed for the lifetime of the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Counter,
    MonotoneCounter,
    Gauge,
    Histogram,
    Meter,
    Timer,
}

/// The `type` field carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Meter,
    Timer,
}

impl MetricKind {
    pub fn metric_type(self) -> MetricType {
        match self {
            MetricKind::Counter | MetricKind::MonotoneCounter => MetricType::Counter,
            MetricKind::Gauge => MetricType::Gauge,
            MetricKind::Histogram => MetricType::Histogram,
            MetricKind::Meter => MetricType::Meter,
            MetricKind::Timer => MetricType::Timer,
        }
    }

    /// Position of this kind in a tick's traversal order
    /// (counters, gauges, histograms, meters, timers).
    pub fn report_order(self) -> u8 {
        match self {
            MetricKind::Counter | MetricKind::MonotoneCounter => 0,
            MetricKind::Gauge => 1,
            MetricKind::Histogram => 2,
            MetricKind::Meter => 3,
            MetricKind::Timer => 4,
        }
    }
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Meter => "meter",
            MetricType::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_counter_kinds_report_as_counter() {
        assert_eq!(MetricKind::Counter.metric_type(), MetricType::Counter);
        assert_eq!(MetricKind::MonotoneCounter.metric_type(), MetricType::Counter);
        assert_eq!(MetricKind::Timer.metric_type().to_string(), "timer");
    }

    #[test]
    fn test_metric_type_serializes_lowercase() {
        let json = serde_json::to_string(&MetricType::Histogram).unwrap();
        assert_eq!(json, "\"histogram\"");
    }
}
