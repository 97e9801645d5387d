//! Change-based suppression of unchanged metrics.
//!
//! A metric is reported when its value changed since its last report, or when
//! `min_reporting_timeout` has elapsed since that report. A report is only
//! recorded once its payload was built and its subject resolved. State lives
//! as long as the reporter and is cleared on stop.

use crate::domain::identity::MetricIdentity;
use crate::domain::kind::MetricKind;
use crate::domain::values::ValueRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct ReportState {
    fingerprint: u64,
    last_reported_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ChangeSuppressor {
    min_reporting_timeout: Duration,
    states: Mutex<HashMap<(MetricKind, MetricIdentity), ReportState>>,
}

impl ChangeSuppressor {
    pub fn new(min_reporting_timeout: Duration) -> Self {
        Self {
            min_reporting_timeout,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a value with `fingerprint` is due for reporting at `now`.
    /// Does not change any state.
    pub fn is_due(
        &self,
        kind: MetricKind,
        identity: &MetricIdentity,
        fingerprint: u64,
        now: DateTime<Utc>,
    ) -> bool {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(previous) = states.get(&(kind, identity.clone())) else {
            return true;
        };
        let elapsed = (now - previous.last_reported_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        previous.fingerprint != fingerprint || elapsed >= self.min_reporting_timeout
    }

    /// Records that the value with `fingerprint` went out at `now`.
    pub fn mark_reported(
        &self,
        kind: MetricKind,
        identity: &MetricIdentity,
        fingerprint: u64,
        now: DateTime<Utc>,
    ) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (kind, identity.clone()),
                ReportState {
                    fingerprint,
                    last_reported_at: now,
                },
            );
    }

    pub fn clear(&self) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn tracked(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Hash of the record's JSON form. `None` if the record cannot be serialized.
pub fn fingerprint(record: &ValueRecord) -> Option<u64> {
    let bytes = serde_json::to_vec(record).ok()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Some(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::CounterValue;
    use chrono::TimeZone;

    fn counter(count: i64) -> u64 {
        fingerprint(&ValueRecord::Counter(CounterValue { count })).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    /// Checks and commits in one step, the way a successful publish would.
    fn report(suppressor: &ChangeSuppressor, id: &MetricIdentity, value: u64, now: i64) -> bool {
        let due = suppressor.is_due(MetricKind::Counter, id, value, at(now));
        if due {
            suppressor.mark_reported(MetricKind::Counter, id, value, at(now));
        }
        due
    }

    #[test]
    fn test_unchanged_value_suppressed_within_timeout() {
        let suppressor = ChangeSuppressor::new(Duration::from_secs(60));
        let id = MetricIdentity::new("requests");

        assert!(report(&suppressor, &id, counter(5), 0));
        assert!(!report(&suppressor, &id, counter(5), 1));
        assert!(!report(&suppressor, &id, counter(5), 59));
    }

    #[test]
    fn test_unchanged_value_reported_after_timeout() {
        let suppressor = ChangeSuppressor::new(Duration::from_secs(60));
        let id = MetricIdentity::new("requests");

        assert!(report(&suppressor, &id, counter(5), 0));
        assert!(report(&suppressor, &id, counter(5), 60));
        // the timeout restarts from the latest report
        assert!(!report(&suppressor, &id, counter(5), 61));
        assert!(report(&suppressor, &id, counter(5), 120));
    }

    #[test]
    fn test_changed_value_always_reported() {
        let suppressor = ChangeSuppressor::new(Duration::from_secs(60));
        let id = MetricIdentity::new("requests");

        assert!(report(&suppressor, &id, counter(5), 0));
        assert!(report(&suppressor, &id, counter(6), 1));
        assert!(!report(&suppressor, &id, counter(6), 2));
    }

    #[test]
    fn test_check_alone_does_not_commit() {
        let suppressor = ChangeSuppressor::new(Duration::from_secs(60));
        let id = MetricIdentity::new("requests");

        assert!(suppressor.is_due(MetricKind::Counter, &id, counter(5), at(0)));
        assert!(suppressor.is_due(MetricKind::Counter, &id, counter(5), at(1)));
        assert_eq!(suppressor.tracked(), 0);
    }

    #[test]
    fn test_zero_timeout_disables_suppression() {
        let suppressor = ChangeSuppressor::new(Duration::ZERO);
        let id = MetricIdentity::new("requests");

        for tick in 0..3 {
            assert!(report(&suppressor, &id, counter(1), tick));
        }
    }

    #[test]
    fn test_state_is_per_identity_and_clearable() {
        let suppressor = ChangeSuppressor::new(Duration::from_secs(60));
        let a = MetricIdentity::new("a");
        let b = MetricIdentity::new("a").with_tag("host", "2");

        assert!(report(&suppressor, &a, counter(1), 0));
        assert!(report(&suppressor, &b, counter(1), 0));
        assert_eq!(suppressor.tracked(), 2);

        suppressor.clear();
        assert_eq!(suppressor.tracked(), 0);
        assert!(report(&suppressor, &a, counter(1), 1));
    }
}
