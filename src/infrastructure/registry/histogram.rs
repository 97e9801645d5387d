use crate::domain::metric::{DistributionSnapshot, HistogramMetric};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Samples kept for distribution statistics.
pub const DEFAULT_WINDOW: usize = 1024;

/// Default bucket upper bounds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 10_000.0,
];

#[derive(Debug)]
struct HistogramState {
    count: u64,
    window: VecDeque<f64>,
    /// One slot per bucket plus the overflow bucket.
    bucket_counts: Vec<u64>,
}

/// Histogram over a sliding window of recent samples, with lifetime bucket
/// counts.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<f64>,
    window_size: usize,
    state: Mutex<HistogramState>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS.to_vec())
    }

    /// Bounds are sorted and deduplicated; non-finite bounds are dropped.
    pub fn with_buckets(mut buckets: Vec<f64>) -> Self {
        buckets.retain(|b| b.is_finite());
        buckets.sort_by(f64::total_cmp);
        buckets.dedup();
        let slots = buckets.len() + 1;

        Self {
            buckets,
            window_size: DEFAULT_WINDOW,
            state: Mutex::new(HistogramState {
                count: 0,
                window: VecDeque::with_capacity(DEFAULT_WINDOW),
                bucket_counts: vec![0; slots],
            }),
        }
    }

    /// Records a sample. Non-finite samples are dropped.
    pub fn update(&self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let slot = self
            .buckets
            .iter()
            .position(|bound| value <= *bound)
            .unwrap_or(self.buckets.len());

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.count += 1;
        state.bucket_counts[slot] += 1;
        if state.window.len() == self.window_size {
            state.window.pop_front();
        }
        state.window.push_back(value);
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramMetric for Histogram {
    fn snapshot(&self) -> DistributionSnapshot {
        let (count, samples, counts) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (
                state.count,
                state.window.iter().copied().collect::<Vec<f64>>(),
                state.bucket_counts.clone(),
            )
        };

        let bucket_counts = self
            .buckets
            .iter()
            .copied()
            .chain(std::iter::once(f64::INFINITY))
            .zip(counts)
            .collect();

        // Empty windows yield NaN statistics; the extractors report them as 0.
        let min = Statistics::min(samples.iter());
        let max = Statistics::max(samples.iter());
        let mean = Statistics::mean(samples.iter());
        let stddev = Statistics::std_dev(samples.iter());
        let mut data = Data::new(samples);

        DistributionSnapshot {
            count,
            min,
            max,
            mean,
            stddev,
            p50: data.quantile(0.5),
            p75: data.quantile(0.75),
            p95: data.quantile(0.95),
            p98: data.quantile(0.98),
            p99: data.quantile(0.99),
            p999: data.quantile(0.999),
            bucket_counts,
        }
    }

    fn buckets(&self) -> Vec<f64> {
        self.buckets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_histogram_statistics_are_nan() {
        let snapshot = Histogram::new().snapshot();
        assert_eq!(snapshot.count, 0);
        assert!(snapshot.mean.is_nan());
        assert!(snapshot.p99.is_nan());
        assert_eq!(snapshot.bucket_counts.len(), DEFAULT_BUCKETS.len() + 1);
    }

    #[test]
    fn test_histogram_statistics() {
        let histogram = Histogram::with_buckets(vec![10.0, 5.0, f64::NAN]);
        for value in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 20.0] {
            histogram.update(value);
        }

        assert_eq!(histogram.buckets(), vec![5.0, 10.0]);

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 10);
        assert_eq!(snapshot.min, 1.0);
        assert_eq!(snapshot.max, 20.0);
        assert!((snapshot.mean - 6.5).abs() < 1e-9);
        assert!(snapshot.stddev > 0.0);
        assert!(snapshot.p50 >= 5.0 && snapshot.p50 <= 6.0);
        assert!(snapshot.p999 <= 20.0);
        assert_eq!(
            snapshot.bucket_counts,
            vec![(5.0, 5), (10.0, 4), (f64::INFINITY, 1)]
        );
    }

    #[test]
    fn test_non_finite_samples_ignored() {
        let histogram = Histogram::with_buckets(vec![5.0]);
        histogram.update(1.0);
        histogram.update(2.0);
        histogram.update(f64::NAN);
        histogram.update(f64::INFINITY);
        histogram.update(3.0);

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.min, 1.0);
        assert_eq!(snapshot.max, 3.0);
        assert!((snapshot.mean - 2.0).abs() < 1e-9);
        assert!(!snapshot.p50.is_nan());
        assert_eq!(snapshot.bucket_counts, vec![(5.0, 3), (f64::INFINITY, 0)]);
    }

    #[test]
    fn test_window_keeps_recent_samples_but_lifetime_count() {
        let histogram = Histogram::new();
        for _ in 0..DEFAULT_WINDOW {
            histogram.update(1000.0);
        }
        for _ in 0..DEFAULT_WINDOW {
            histogram.update(1.0);
        }

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 2 * DEFAULT_WINDOW as u64);
        assert_eq!(snapshot.max, 1.0);
    }
}
