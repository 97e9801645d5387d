use crate::domain::state::ReporterState;
use thiserror::Error;

/// Errors raised by the reporting pipeline.
///
/// Per-metric variants (`Extraction`, `Encode`, `Resolve`, `Publish`,
/// `PublishTimeout`) never abort a tick on their own; publish-side failures are
/// collected into `TickFailed`.
#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("Transport connection failed: {source}")]
    Connection {
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot {operation} while reporter is {state}")]
    InvalidState {
        operation: &'static str,
        state: ReporterState,
    },

    #[error("Reporter is not running")]
    NotRunning,

    #[error("Failed to read metric {metric}: {source}")]
    Extraction {
        metric: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to encode message for {metric}: {source}")]
    Encode {
        metric: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to resolve subject for {metric}: {source}")]
    Resolve {
        metric: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Publish of {metric} to {subject} failed: {source}")]
    Publish {
        metric: String,
        subject: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Publish of {metric} to {subject} timed out after {timeout_ms}ms")]
    PublishTimeout {
        metric: String,
        subject: String,
        timeout_ms: u64,
    },

    #[error("Transport close failed: {source}")]
    Shutdown {
        #[source]
        source: anyhow::Error,
    },

    #[error("Tick failed: {} of {attempted} publishes failed", .failures.len())]
    TickFailed {
        attempted: usize,
        failures: Vec<ReportingError>,
    },
}

impl ReportingError {
    /// Name of the metric a per-metric error refers to.
    pub fn metric(&self) -> Option<&str> {
        match self {
            ReportingError::Extraction { metric, .. }
            | ReportingError::Encode { metric, .. }
            | ReportingError::Resolve { metric, .. }
            | ReportingError::Publish { metric, .. }
            | ReportingError::PublishTimeout { metric, .. } => Some(metric),
            _ => None,
        }
    }
}
