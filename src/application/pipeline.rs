//! One reporting tick: snapshot the registry, build envelopes, publish them
//! concurrently and aggregate the outcomes.

use crate::application::extractors;
use crate::application::options::ReporterOptions;
use crate::application::suppression::{self, ChangeSuppressor};
use crate::domain::envelope::ReportEnvelope;
use crate::domain::errors::ReportingError;
use crate::domain::identity::MetricIdentity;
use crate::domain::kind::MetricKind;
use crate::domain::metric::RegisteredMetric;
use crate::domain::ports::{
    Clock, Connection, Diagnostics, MessageBuilder, MetricRegistry, SubjectResolver,
};
use crate::domain::tick::{PublishRecord, TickReport};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Suppression entry to commit once the metric's subject is resolved.
struct PendingMark {
    kind: MetricKind,
    identity: MetricIdentity,
    fingerprint: u64,
}

/// A metric ready to go out.
struct Outgoing {
    envelope: ReportEnvelope,
    payload: Vec<u8>,
    mark: Option<PendingMark>,
}

/// Result of preparing one metric for publication.
enum Prepared {
    Ready(Outgoing),
    Suppressed,
    Skipped,
    Failed(ReportingError),
}

/// Shared state of a reporter, used by the scheduled loop, by ticks running
/// on their own tasks, and by direct event reporting.
pub(crate) struct ReportingCore {
    pub(crate) options: ReporterOptions,
    pub(crate) registry: Arc<dyn MetricRegistry>,
    pub(crate) builder: Arc<dyn MessageBuilder>,
    pub(crate) resolver: Arc<dyn SubjectResolver>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) diagnostics: Arc<dyn Diagnostics>,
    pub(crate) suppressor: ChangeSuppressor,
    connection: RwLock<Option<Arc<dyn Connection>>>,
}

impl ReportingCore {
    pub(crate) fn new(
        options: ReporterOptions,
        registry: Arc<dyn MetricRegistry>,
        builder: Arc<dyn MessageBuilder>,
        resolver: Arc<dyn SubjectResolver>,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let suppressor = ChangeSuppressor::new(options.min_reporting_timeout);
        Self {
            options,
            registry,
            builder,
            resolver,
            clock,
            diagnostics,
            suppressor,
            connection: RwLock::new(None),
        }
    }

    pub(crate) fn attach(&self, connection: Arc<dyn Connection>) {
        *self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(connection);
    }

    pub(crate) fn detach(&self) -> Option<Arc<dyn Connection>> {
        self.connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn connection(&self) -> Result<Arc<dyn Connection>, ReportingError> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ReportingError::NotRunning)
    }

    /// Runs a tick started by the schedule and hands the outcome to
    /// diagnostics.
    pub(crate) async fn run_scheduled_tick(&self, connection: Arc<dyn Connection>) {
        let report = self.run_tick(&connection).await;
        self.diagnostics.tick_completed(&report);
        if let Err(error) = report.into_result() {
            self.diagnostics.tick_failed(&error);
        }
    }

    pub(crate) async fn run_tick(&self, connection: &Arc<dyn Connection>) -> TickReport {
        // One timestamp for the whole batch.
        let timestamp = self.clock.now();
        let mut report = TickReport::new(timestamp);

        let mut metrics = self.registry.list_metrics();
        metrics.sort_by_key(|metric| metric.kind().report_order());

        let mut ready = Vec::with_capacity(metrics.len());
        for metric in &metrics {
            match self.prepare(metric, timestamp) {
                Prepared::Ready(outgoing) => ready.push(outgoing),
                Prepared::Suppressed => report.suppressed += 1,
                Prepared::Skipped => report.skipped += 1,
                Prepared::Failed(error) => {
                    self.diagnostics.metric_failed(&error);
                    report.extraction_failures.push(error);
                }
            }
        }

        debug!(
            metrics = metrics.len(),
            publishing = ready.len(),
            suppressed = report.suppressed,
            "Publishing tick"
        );

        let deliveries = ready
            .into_iter()
            .map(|outgoing| self.deliver(connection, outgoing, timestamp));
        report.publishes = join_all(deliveries).await;

        report
    }

    fn prepare(&self, metric: &RegisteredMetric, timestamp: DateTime<Utc>) -> Prepared {
        let kind = metric.kind();
        let values = match extractors::extract(metric, self.options.with_buckets) {
            Ok(Some(values)) => values,
            Ok(None) => return Prepared::Skipped,
            Err(error) => return Prepared::Failed(error),
        };

        // Values that cannot be fingerprinted are always reported.
        let fingerprint = suppression::fingerprint(&values);
        if let Some(fingerprint) = fingerprint {
            if !self
                .suppressor
                .is_due(kind, &metric.identity, fingerprint, timestamp)
            {
                return Prepared::Suppressed;
            }
        }

        let tags = metric.identity.merged_tags(&self.options.tags);
        let envelope = ReportEnvelope::assemble(&metric.identity, kind, timestamp, tags, values);

        match self.builder.build(&envelope) {
            Ok(Some(payload)) => Prepared::Ready(Outgoing {
                envelope,
                payload,
                mark: fingerprint.map(|fingerprint| PendingMark {
                    kind,
                    identity: metric.identity.clone(),
                    fingerprint,
                }),
            }),
            Ok(None) => Prepared::Skipped,
            Err(source) => Prepared::Failed(ReportingError::Encode {
                metric: metric.identity.qualified_name(),
                source,
            }),
        }
    }

    /// Resolves the subject of one envelope and publishes it.
    async fn deliver(
        &self,
        connection: &Arc<dyn Connection>,
        outgoing: Outgoing,
        timestamp: DateTime<Utc>,
    ) -> PublishRecord {
        let Outgoing {
            envelope,
            payload,
            mark,
        } = outgoing;
        let metric = envelope.qualified_name();
        let subject = match self.resolver.resolve(&envelope).await {
            Ok(subject) => subject,
            Err(source) => {
                return PublishRecord {
                    envelope,
                    subject: None,
                    outcome: Err(ReportingError::Resolve { metric, source }),
                };
            }
        };

        // Counted as reported from here on, whatever the publish outcome.
        if let Some(mark) = mark {
            self.suppressor
                .mark_reported(mark.kind, &mark.identity, mark.fingerprint, timestamp);
        }

        let outcome = self.publish(connection, &metric, &subject, payload).await;
        PublishRecord {
            envelope,
            subject: Some(subject),
            outcome,
        }
    }

    pub(crate) async fn publish(
        &self,
        connection: &Arc<dyn Connection>,
        metric: &str,
        subject: &str,
        payload: Vec<u8>,
    ) -> Result<(), ReportingError> {
        let publish = connection.publish(subject, payload);
        let result = match self.options.publish_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, publish).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ReportingError::PublishTimeout {
                        metric: metric.to_string(),
                        subject: subject.to_string(),
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            },
            None => publish.await,
        };

        result.map_err(|source| ReportingError::Publish {
            metric: metric.to_string(),
            subject: subject.to_string(),
            source,
        })
    }
}
