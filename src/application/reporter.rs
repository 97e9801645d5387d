//! Scheduled metric reporter.
//!
//! Owns the `Stopped -> Starting -> Running -> Stopping -> Stopped` lifecycle,
//! drives one tick per scheduler period and exposes direct event reporting.

use crate::application::diagnostics::TracingDiagnostics;
use crate::application::message_builder::JsonMessageBuilder;
use crate::application::options::ReporterOptions;
use crate::application::pipeline::ReportingCore;
use crate::application::subject_resolver::FixedSubjectResolver;
use crate::domain::envelope::ReportEnvelope;
use crate::domain::errors::ReportingError;
use crate::domain::event::Event;
use crate::domain::kind::MetricKind;
use crate::domain::ports::{
    Clock, Connection, Diagnostics, MessageBuilder, MetricRegistry, Scheduler, SubjectResolver,
    Ticker, Transport,
};
use crate::domain::state::ReporterState;
use crate::domain::tick::TickReport;
use crate::domain::values::{GaugeValue, ValueRecord};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::scheduler::IntervalScheduler;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Handles owned while the reporter is running.
struct Running {
    connection: Arc<dyn Connection>,
    cancel: CancellationToken,
    schedule: JoinHandle<()>,
    ticks: TaskTracker,
}

/// Builder for constructing a [`MetricReporter`].
pub struct MetricReporterBuilder {
    registry: Arc<dyn MetricRegistry>,
    transport: Arc<dyn Transport>,
    options: ReporterOptions,
    message_builder: Option<Arc<dyn MessageBuilder>>,
    subject_resolver: Option<Arc<dyn SubjectResolver>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    clock: Option<Arc<dyn Clock>>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl MetricReporterBuilder {
    pub fn options(mut self, options: ReporterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn message_builder(mut self, builder: Arc<dyn MessageBuilder>) -> Self {
        self.message_builder = Some(builder);
        self
    }

    pub fn subject_resolver(mut self, resolver: Arc<dyn SubjectResolver>) -> Self {
        self.subject_resolver = Some(resolver);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn build(self) -> MetricReporter {
        let core = ReportingCore::new(
            self.options,
            self.registry,
            self.message_builder
                .unwrap_or_else(|| Arc::new(JsonMessageBuilder)),
            self.subject_resolver
                .unwrap_or_else(|| Arc::new(FixedSubjectResolver::default())),
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.diagnostics
                .unwrap_or_else(|| Arc::new(TracingDiagnostics)),
        );
        let (state, _) = watch::channel(ReporterState::Stopped);

        MetricReporter {
            core: Arc::new(core),
            transport: self.transport,
            scheduler: self
                .scheduler
                .unwrap_or_else(|| Arc::new(IntervalScheduler)),
            lifecycle: Mutex::new(None),
            state,
        }
    }
}

/// Periodically publishes every registry metric through a transport.
pub struct MetricReporter {
    core: Arc<ReportingCore>,
    transport: Arc<dyn Transport>,
    scheduler: Arc<dyn Scheduler>,
    lifecycle: Mutex<Option<Running>>,
    state: watch::Sender<ReporterState>,
}

impl MetricReporter {
    pub fn builder(
        registry: Arc<dyn MetricRegistry>,
        transport: Arc<dyn Transport>,
    ) -> MetricReporterBuilder {
        MetricReporterBuilder {
            registry,
            transport,
            options: ReporterOptions::default(),
            message_builder: None,
            subject_resolver: None,
            scheduler: None,
            clock: None,
            diagnostics: None,
        }
    }

    pub fn state(&self) -> ReporterState {
        *self.state.borrow()
    }

    /// Watch channel following every lifecycle transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ReporterState> {
        self.state.subscribe()
    }

    pub fn options(&self) -> &ReporterOptions {
        &self.core.options
    }

    /// Connects the transport and starts the tick schedule.
    ///
    /// On a connection error the reporter goes back to `Stopped` and the error
    /// is returned.
    pub async fn start(&self) -> Result<&Self, ReportingError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let current = self.state();
        if current != ReporterState::Stopped {
            return Err(ReportingError::InvalidState {
                operation: "start",
                state: current,
            });
        }

        self.state.send_replace(ReporterState::Starting);
        let connection = match self.transport.connect().await {
            Ok(connection) => connection,
            Err(source) => {
                self.state.send_replace(ReporterState::Stopped);
                error!("MetricReporter: Failed to connect transport: {:#}", source);
                return Err(ReportingError::Connection { source });
            }
        };
        self.core.attach(Arc::clone(&connection));

        let cancel = CancellationToken::new();
        let ticks = TaskTracker::new();
        let interval = self.core.options.interval();
        let ticker = self.scheduler.ticker(interval);
        let schedule = tokio::spawn(run_schedule(
            Arc::clone(&self.core),
            ticker,
            Arc::clone(&connection),
            cancel.clone(),
            ticks.clone(),
        ));

        *lifecycle = Some(Running {
            connection,
            cancel,
            schedule,
            ticks,
        });
        self.state.send_replace(ReporterState::Running);
        info!("MetricReporter: Started (interval: {:?})", interval);

        Ok(self)
    }

    /// Cancels future ticks, waits for in-flight ticks and closes the
    /// connection.
    ///
    /// The reporter ends up `Stopped` even when closing the connection fails;
    /// that failure is returned as `Shutdown`. Stopping a stopped reporter is a
    /// no-op.
    pub async fn stop(&self) -> Result<(), ReportingError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(running) = lifecycle.take() else {
            return Ok(());
        };

        self.state.send_replace(ReporterState::Stopping);
        info!("MetricReporter: Stopping, waiting for in-flight ticks...");

        // Direct reports are refused from here on; running ticks keep their
        // own handle to the connection.
        self.core.detach();
        running.cancel.cancel();
        if let Err(e) = running.schedule.await {
            warn!("MetricReporter: Schedule task ended abnormally: {}", e);
        }
        running.ticks.close();
        running.ticks.wait().await;

        self.core.suppressor.clear();

        let result = running
            .connection
            .close()
            .await
            .map_err(|source| ReportingError::Shutdown { source });
        self.state.send_replace(ReporterState::Stopped);

        match &result {
            Ok(()) => info!("MetricReporter: Stopped"),
            Err(e) => error!("MetricReporter: Stopped with error: {}", e),
        }
        result
    }

    /// Runs one tick immediately, outside the schedule, and returns its
    /// report.
    pub async fn report_once(&self) -> Result<TickReport, ReportingError> {
        let connection = self.core.connection()?;
        Ok(self.core.run_tick(&connection).await)
    }

    /// Publishes a single event now, as a `gauge` envelope.
    ///
    /// Returns the event once its publish settled.
    pub async fn report_event<T: Serialize>(
        &self,
        event: Event<T>,
    ) -> Result<Event<T>, ReportingError> {
        self.publish_event(event, None).await
    }

    /// Like [`report_event`](Self::report_event) but bypasses the subject
    /// resolver.
    pub async fn report_event_to<T: Serialize>(
        &self,
        event: Event<T>,
        subject: &str,
    ) -> Result<Event<T>, ReportingError> {
        self.publish_event(event, Some(subject)).await
    }

    async fn publish_event<T: Serialize>(
        &self,
        event: Event<T>,
        subject: Option<&str>,
    ) -> Result<Event<T>, ReportingError> {
        let connection = self.core.connection()?;
        let identity = event.identity();
        let metric = identity.qualified_name();

        let value = serde_json::to_value(&event.value).map_err(|e| ReportingError::Encode {
            metric: metric.clone(),
            source: e.into(),
        })?;
        let tags = identity.merged_tags(&self.core.options.tags);
        let envelope = ReportEnvelope::assemble(
            &identity,
            MetricKind::Gauge,
            event.time,
            tags,
            ValueRecord::Gauge(GaugeValue { value }),
        )
        .with_description(event.description.clone());

        let payload = match self.core.builder.build(&envelope) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(event),
            Err(source) => return Err(ReportingError::Encode { metric, source }),
        };

        let subject = match subject {
            Some(subject) => subject.to_string(),
            None => self
                .core
                .resolver
                .resolve(&envelope)
                .await
                .map_err(|source| ReportingError::Resolve {
                    metric: metric.clone(),
                    source,
                })?,
        };

        self.core
            .publish(&connection, &metric, &subject, payload)
            .await?;
        Ok(event)
    }
}

/// Fixed-cadence loop: every tick runs on its own task so a slow tick never
/// delays the next one.
async fn run_schedule(
    core: Arc<ReportingCore>,
    mut ticker: Box<dyn Ticker>,
    connection: Arc<dyn Connection>,
    cancel: CancellationToken,
    ticks: TaskTracker,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let core = Arc::clone(&core);
                let connection = Arc::clone(&connection);
                ticks.spawn(async move {
                    core.run_scheduled_tick(connection).await;
                });
            }
        }
    }
}
