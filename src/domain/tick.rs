use crate::domain::envelope::ReportEnvelope;
use crate::domain::errors::ReportingError;
use chrono::{DateTime, Utc};

/// Outcome of one publish issued during a tick.
#[derive(Debug)]
pub struct PublishRecord {
    pub envelope: ReportEnvelope,
    /// `None` when the subject could not be resolved.
    pub subject: Option<String>,
    pub outcome: Result<(), ReportingError>,
}

impl PublishRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Aggregate of a single tick. Discarded once handed to diagnostics.
#[derive(Debug)]
pub struct TickReport {
    pub timestamp: DateTime<Utc>,
    pub publishes: Vec<PublishRecord>,
    /// Metrics left out because their value did not change.
    pub suppressed: usize,
    /// Metrics that had no value or whose builder chose to skip them.
    pub skipped: usize,
    /// Metrics that could not be read or encoded.
    pub extraction_failures: Vec<ReportingError>,
}

impl TickReport {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            publishes: Vec::new(),
            suppressed: 0,
            skipped: 0,
            extraction_failures: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.publishes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.publishes.iter().filter(|p| p.is_success()).count()
    }

    /// A tick fails when at least one publish failed.
    pub fn is_failed(&self) -> bool {
        self.publishes.iter().any(|p| !p.is_success())
    }

    /// Collapses the tick into a single result, keeping every per-metric
    /// publish failure in `TickFailed`.
    pub fn into_result(self) -> Result<usize, ReportingError> {
        let attempted = self.publishes.len();
        let failures: Vec<ReportingError> = self
            .publishes
            .into_iter()
            .filter_map(|p| p.outcome.err())
            .collect();

        if failures.is_empty() {
            Ok(attempted)
        } else {
            Err(ReportingError::TickFailed {
                attempted,
                failures,
            })
        }
    }
}
