//! Value records emitted for each metric kind.
//!
//! Every record is built fresh on each tick from a live read of the metric.
//! Floating point statistics never carry NaN; the extractors normalize them to 0.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterValue {
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeValue {
    pub value: serde_json::Value,
}

/// Distribution statistics shared by histograms and timers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionValues {
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
    /// Per-bucket sample counts keyed by the bucket's upper bound.
    #[serde(serialize_with = "serialize_bucket_counts")]
    pub bucket_counts: Vec<(f64, u64)>,
    /// Configured bucket boundaries, only present when the reporter opted in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<f64>>,
}

/// Throughput rates shared by meters and timers, in events per second.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateValues {
    pub mean_rate: f64,
    pub m1_rate: f64,
    pub m5_rate: f64,
    pub m15_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramValue {
    pub count: u64,
    #[serde(flatten)]
    pub distribution: DistributionValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterValue {
    pub count: u64,
    #[serde(flatten)]
    pub rates: RateValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerValue {
    pub count: u64,
    #[serde(flatten)]
    pub distribution: DistributionValues,
    #[serde(flatten)]
    pub rates: RateValues,
}

/// Kind-specific value of one metric at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueRecord {
    Counter(CounterValue),
    Gauge(GaugeValue),
    Histogram(HistogramValue),
    Meter(MeterValue),
    Timer(TimerValue),
}

/// Renders a bucket upper bound as a JSON object key.
pub fn bucket_key(upper_bound: f64) -> String {
    if upper_bound.is_infinite() && upper_bound.is_sign_positive() {
        "+Inf".to_string()
    } else {
        upper_bound.to_string()
    }
}

fn serialize_bucket_counts<S>(counts: &[(f64, u64)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for (upper_bound, count) in counts {
        map.serialize_entry(&bucket_key(*upper_bound), count)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn distribution() -> DistributionValues {
        DistributionValues {
            min: 1.0,
            max: 9.0,
            mean: 5.0,
            stddev: 2.5,
            p50: 5.0,
            p75: 7.0,
            p95: 9.0,
            p98: 9.0,
            p99: 9.0,
            p999: 9.0,
            bucket_counts: vec![(5.0, 3), (10.0, 2), (f64::INFINITY, 0)],
            buckets: None,
        }
    }

    #[test]
    fn test_timer_value_is_flat_union() {
        let record = ValueRecord::Timer(TimerValue {
            count: 5,
            distribution: distribution(),
            rates: RateValues {
                mean_rate: 0.5,
                m1_rate: 0.1,
                m5_rate: 0.2,
                m15_rate: 0.3,
            },
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["count"], json!(5));
        assert_eq!(json["p999"], json!(9.0));
        assert_eq!(json["m15_rate"], json!(0.3));
        assert_eq!(json["bucket_counts"], json!({"5": 3, "10": 2, "+Inf": 0}));
        assert!(json.get("buckets").is_none());
    }

    #[test]
    fn test_buckets_emitted_when_present() {
        let mut values = distribution();
        values.buckets = Some(vec![5.0, 10.0]);
        let record = ValueRecord::Histogram(HistogramValue {
            count: 5,
            distribution: values,
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["buckets"], json!([5.0, 10.0]));
    }

    #[test]
    fn test_counter_and_gauge_shapes() {
        let counter = serde_json::to_value(ValueRecord::Counter(CounterValue { count: 7 })).unwrap();
        assert_eq!(counter, json!({"count": 7}));

        let gauge = serde_json::to_value(ValueRecord::Gauge(GaugeValue {
            value: json!({"version": "1.2.3"}),
        }))
        .unwrap();
        assert_eq!(gauge, json!({"value": {"version": "1.2.3"}}));
    }
}
