use nats_metrics_reporter::application::subject_resolver::FixedSubjectResolver;
use nats_metrics_reporter::application::{MetricReporter, ReporterOptions};
use nats_metrics_reporter::domain::errors::ReportingError;
use nats_metrics_reporter::domain::event::Event;
use nats_metrics_reporter::domain::identity::MetricIdentity;
use nats_metrics_reporter::domain::state::ReporterState;
use nats_metrics_reporter::infrastructure::{
    InMemoryRegistry, ManualScheduler, MockTransport, RecordingDiagnostics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const WAIT: Duration = Duration::from_secs(2);

fn reporter(
    registry: &Arc<InMemoryRegistry>,
    transport: &MockTransport,
) -> (MetricReporter, ManualScheduler, RecordingDiagnostics) {
    let scheduler = ManualScheduler::new();
    let diagnostics = RecordingDiagnostics::new();
    let reporter = MetricReporter::builder(registry.clone(), Arc::new(transport.clone()))
        .scheduler(Arc::new(scheduler.clone()))
        .diagnostics(Arc::new(diagnostics.clone()))
        .build();
    (reporter, scheduler, diagnostics)
}

#[tokio::test]
async fn test_start_against_unreachable_transport_stays_stopped() {
    let registry = Arc::new(InMemoryRegistry::new());
    let transport = MockTransport::unreachable("no servers");
    let (reporter, scheduler, _) = reporter(&registry, &transport);

    let result = reporter.start().await;
    assert!(matches!(result, Err(ReportingError::Connection { .. })));
    assert_eq!(reporter.state(), ReporterState::Stopped);
    assert!(scheduler.requested_periods().is_empty());

    // Nothing to stop.
    assert_ok!(reporter.stop().await);
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let registry = Arc::new(InMemoryRegistry::new());
    let transport = MockTransport::new();
    let (reporter, _, _) = reporter(&registry, &transport);

    assert!(reporter.start().await.is_ok());
    assert_eq!(reporter.state(), ReporterState::Running);

    let second = reporter.start().await;
    assert!(matches!(
        second,
        Err(ReportingError::InvalidState {
            operation: "start",
            state: ReporterState::Running
        })
    ));
    assert_eq!(transport.connect_count(), 1);

    assert_ok!(reporter.stop().await);
}

#[tokio::test]
async fn test_stop_is_idempotent_and_restartable() {
    let registry = Arc::new(InMemoryRegistry::new());
    let transport = MockTransport::new();
    let (reporter, _, _) = reporter(&registry, &transport);

    assert!(reporter.start().await.is_ok());
    assert_ok!(reporter.stop().await);
    assert_ok!(reporter.stop().await);
    assert_eq!(reporter.state(), ReporterState::Stopped);
    assert_eq!(transport.close_count(), 1);

    assert!(reporter.start().await.is_ok());
    assert_eq!(transport.connect_count(), 2);
    assert_ok!(reporter.stop().await);
}

#[tokio::test]
async fn test_failed_close_still_ends_stopped() {
    let registry = Arc::new(InMemoryRegistry::new());
    let transport = MockTransport::new();
    transport.fail_close("socket already gone");
    let (reporter, _, _) = reporter(&registry, &transport);

    assert!(reporter.start().await.is_ok());
    let error = assert_err!(reporter.stop().await);

    assert!(matches!(error, ReportingError::Shutdown { .. }));
    assert!(error.to_string().contains("socket already gone"));
    assert_eq!(reporter.state(), ReporterState::Stopped);
}

#[tokio::test]
async fn test_report_once_requires_running_reporter() {
    let registry = Arc::new(InMemoryRegistry::new());
    let transport = MockTransport::new();
    let (reporter, _, _) = reporter(&registry, &transport);

    let error = assert_err!(reporter.report_once().await);
    assert!(matches!(error, ReportingError::NotRunning));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_schedule_uses_configured_interval_and_stops_ticking() {
    let registry = Arc::new(InMemoryRegistry::new());
    let requests = registry
        .monotone_counter(MetricIdentity::new("requests"))
        .unwrap();
    requests.increment(1);
    let transport = MockTransport::new();
    let (reporter, scheduler, diagnostics) = reporter(&registry, &transport);

    assert!(reporter.start().await.is_ok());
    assert_eq!(scheduler.requested_periods(), vec![Duration::from_secs(1)]);

    assert!(scheduler.trigger());
    assert!(diagnostics.wait_for_ticks(1, WAIT).await);

    requests.increment(1);
    assert!(scheduler.trigger());
    assert!(diagnostics.wait_for_ticks(2, WAIT).await);
    assert_eq!(transport.published().len(), 2);

    assert_ok!(reporter.stop().await);
    assert!(!scheduler.trigger());
    assert_eq!(diagnostics.ticks().len(), 2);
    assert!(diagnostics.tick_failures().is_empty());
}

#[tokio::test]
async fn test_state_changes_are_observable() {
    let registry = Arc::new(InMemoryRegistry::new());
    let transport = MockTransport::new();
    let (reporter, _, _) = reporter(&registry, &transport);
    let mut states = reporter.subscribe_state();

    assert!(reporter.start().await.is_ok());
    assert_ok!(states.changed().await);
    assert_eq!(*states.borrow_and_update(), ReporterState::Running);

    assert_ok!(reporter.stop().await);
    assert_ok!(states.changed().await);
    assert_eq!(*states.borrow_and_update(), ReporterState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_tick() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry
        .counter(MetricIdentity::new("slow"))
        .unwrap()
        .increment(1);
    let transport = MockTransport::new();
    transport.hang_subject("metrics");

    let scheduler = ManualScheduler::new();
    let diagnostics = RecordingDiagnostics::new();
    let reporter = Arc::new(
        MetricReporter::builder(registry.clone(), Arc::new(transport.clone()))
            .options(ReporterOptions {
                publish_timeout: Some(Duration::from_millis(500)),
                ..Default::default()
            })
            .subject_resolver(Arc::new(FixedSubjectResolver::new("metrics")))
            .scheduler(Arc::new(scheduler.clone()))
            .diagnostics(Arc::new(diagnostics.clone()))
            .build(),
    );

    assert!(reporter.start().await.is_ok());
    assert!(scheduler.trigger());
    while transport.attempts() == 0 {
        tokio::task::yield_now().await;
    }

    let stopping = Arc::clone(&reporter);
    let stop = tokio::spawn(async move { stopping.stop().await });
    let mut states = reporter.subscribe_state();
    assert_ok!(states.wait_for(|s| *s == ReporterState::Stopping).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!stop.is_finished());
    assert_eq!(reporter.state(), ReporterState::Stopping);
    assert!(diagnostics.ticks().is_empty());

    // Direct reports are refused once stopping began.
    let error = assert_err!(reporter.report_once().await);
    assert!(matches!(error, ReportingError::NotRunning));
    let error = assert_err!(reporter.report_event(Event::new("late", 1)).await);
    assert!(matches!(error, ReportingError::NotRunning));

    assert_ok!(assert_ok!(stop.await));
    assert_eq!(reporter.state(), ReporterState::Stopped);
    assert_eq!(transport.close_count(), 1);

    let ticks = diagnostics.ticks();
    assert_eq!(ticks.len(), 1);
    assert!(ticks[0].failed);
    assert!(
        diagnostics
            .tick_failures()
            .iter()
            .any(|f| f.contains("timed out"))
    );
    assert_eq!(transport.attempts(), 1);
}
