//! Value extractors: turn a live metric into its `ValueRecord`.
//!
//! Extraction is synchronous and reads each metric through a single snapshot
//! call, so all fields of a record describe the same instant.

use crate::domain::errors::ReportingError;
use crate::domain::metric::{
    CounterMetric, DistributionSnapshot, GaugeMetric, HistogramMetric, MeterMetric, MetricHandle,
    RateSnapshot, RegisteredMetric, TimerMetric,
};
use crate::domain::values::{
    CounterValue, DistributionValues, GaugeValue, HistogramValue, MeterValue, RateValues,
    TimerValue, ValueRecord,
};

/// Extracts the value of any registered metric.
///
/// Returns `Ok(None)` when the metric currently has no value to report.
pub fn extract(
    metric: &RegisteredMetric,
    with_buckets: bool,
) -> Result<Option<ValueRecord>, ReportingError> {
    let record = match &metric.handle {
        MetricHandle::Counter(counter) | MetricHandle::MonotoneCounter(counter) => {
            Some(ValueRecord::Counter(counter_value(counter.as_ref())))
        }
        MetricHandle::Gauge(gauge) => gauge_value(gauge.as_ref())
            .map_err(|source| ReportingError::Extraction {
                metric: metric.identity.qualified_name(),
                source,
            })?
            .map(ValueRecord::Gauge),
        MetricHandle::Histogram(histogram) => Some(ValueRecord::Histogram(histogram_value(
            histogram.as_ref(),
            with_buckets,
        ))),
        MetricHandle::Meter(meter) => Some(ValueRecord::Meter(meter_value(meter.as_ref()))),
        MetricHandle::Timer(timer) => {
            Some(ValueRecord::Timer(timer_value(timer.as_ref(), with_buckets)))
        }
    };
    Ok(record)
}

pub fn counter_value(counter: &dyn CounterMetric) -> CounterValue {
    CounterValue {
        count: counter.count(),
    }
}

pub fn gauge_value(gauge: &dyn GaugeMetric) -> anyhow::Result<Option<GaugeValue>> {
    Ok(gauge.value()?.map(|value| GaugeValue { value }))
}

pub fn histogram_value(histogram: &dyn HistogramMetric, with_buckets: bool) -> HistogramValue {
    let snapshot = histogram.snapshot();
    let buckets = with_buckets.then(|| histogram.buckets());

    HistogramValue {
        count: snapshot.count,
        distribution: distribution_values(snapshot, buckets),
    }
}

pub fn meter_value(meter: &dyn MeterMetric) -> MeterValue {
    let rates = meter.rates();

    MeterValue {
        count: rates.count,
        rates: rate_values(&rates),
    }
}

pub fn timer_value(timer: &dyn TimerMetric, with_buckets: bool) -> TimerValue {
    let (distribution, rates) = timer.snapshot();
    let buckets = with_buckets.then(|| timer.buckets());

    TimerValue {
        count: distribution.count,
        distribution: distribution_values(distribution, buckets),
        rates: rate_values(&rates),
    }
}

fn distribution_values(
    snapshot: DistributionSnapshot,
    buckets: Option<Vec<f64>>,
) -> DistributionValues {
    DistributionValues {
        min: defined_or_zero(snapshot.min),
        max: defined_or_zero(snapshot.max),
        mean: defined_or_zero(snapshot.mean),
        stddev: defined_or_zero(snapshot.stddev),
        p50: defined_or_zero(snapshot.p50),
        p75: defined_or_zero(snapshot.p75),
        p95: defined_or_zero(snapshot.p95),
        p98: defined_or_zero(snapshot.p98),
        p99: defined_or_zero(snapshot.p99),
        p999: defined_or_zero(snapshot.p999),
        bucket_counts: snapshot.bucket_counts,
        buckets,
    }
}

fn rate_values(rates: &RateSnapshot) -> RateValues {
    RateValues {
        mean_rate: defined_or_zero(rates.mean_rate),
        m1_rate: defined_or_zero(rates.m1_rate),
        m5_rate: defined_or_zero(rates.m5_rate),
        m15_rate: defined_or_zero(rates.m15_rate),
    }
}

/// NaN and infinities have no JSON representation; they are reported as 0.
fn defined_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
