use crate::domain::errors::ReportingError;
use crate::domain::ports::Diagnostics;
use crate::domain::tick::TickReport;
use tracing::{debug, warn};

/// Default diagnostics sink: everything goes to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn metric_failed(&self, error: &ReportingError) {
        warn!(
            metric = error.metric().unwrap_or("unknown"),
            "Skipping metric for this tick: {}", error
        );
    }

    fn tick_completed(&self, report: &TickReport) {
        debug!(
            timestamp = %report.timestamp,
            attempted = report.attempted(),
            succeeded = report.succeeded(),
            suppressed = report.suppressed,
            skipped = report.skipped,
            "Reporting tick completed"
        );
    }

    fn tick_failed(&self, error: &ReportingError) {
        warn!("{}", error);
        if let ReportingError::TickFailed { failures, .. } = error {
            for failure in failures {
                warn!(metric = failure.metric().unwrap_or("unknown"), "  {}", failure);
            }
        }
    }
}
