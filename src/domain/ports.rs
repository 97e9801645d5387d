use crate::domain::envelope::ReportEnvelope;
use crate::domain::errors::ReportingError;
use crate::domain::metric::RegisteredMetric;
use crate::domain::tick::TickReport;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Source of the metrics reported on each tick.
pub trait MetricRegistry: Send + Sync {
    /// Every metric registered up to this call. Must not block indefinitely.
    fn list_metrics(&self) -> Vec<RegisteredMetric>;
}

/// Factory for the single connection a reporter publishes through.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Connection>>;
}

/// Live transport connection, shared by all publishes of a tick.
///
/// Implementations must accept concurrent `publish` calls.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Settles once the transport acknowledged or rejected the message.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Encodes an envelope into the payload handed to the transport.
pub trait MessageBuilder: Send + Sync {
    /// `Ok(None)` skips the metric for this tick.
    fn build(&self, envelope: &ReportEnvelope) -> Result<Option<Vec<u8>>>;
}

/// Chooses the subject an envelope is published to.
#[async_trait]
pub trait SubjectResolver: Send + Sync {
    async fn resolve(&self, envelope: &ReportEnvelope) -> Result<String>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Produces the periodic ticks driving the reporter.
pub trait Scheduler: Send + Sync {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

#[async_trait]
pub trait Ticker: Send {
    /// Completes when the next tick is due.
    async fn tick(&mut self);
}

/// Sink for reporting diagnostics. No method may panic.
pub trait Diagnostics: Send + Sync {
    /// A metric was left out of a tick because it could not be read or encoded.
    fn metric_failed(&self, error: &ReportingError);
    /// A scheduled tick settled; called for failed and successful ticks.
    fn tick_completed(&self, report: &TickReport);
    /// A scheduled tick had at least one failed publish.
    fn tick_failed(&self, error: &ReportingError);
}
