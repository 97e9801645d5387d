//! In-memory transport and diagnostics for tests and demos.

use crate::domain::errors::ReportingError;
use crate::domain::ports::{Connection, Diagnostics, Transport};
use crate::domain::tick::TickReport;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// A message accepted by the mock transport.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.payload).ok()
    }
}

#[derive(Default)]
struct MockTransportState {
    published: Mutex<Vec<PublishedMessage>>,
    failing_subjects: Mutex<HashSet<String>>,
    hanging_subjects: Mutex<HashSet<String>>,
    connect_error: Mutex<Option<String>>,
    close_error: Mutex<Option<String>>,
    attempts: AtomicUsize,
    connects: AtomicUsize,
    closes: AtomicUsize,
    notify: Notify,
}

/// Transport that records publishes in memory.
///
/// Clones share the same state, so a test can keep a handle while the
/// reporter owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockTransportState>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `connect` always fails.
    pub fn unreachable(reason: &str) -> Self {
        let transport = Self::new();
        *lock(&transport.state.connect_error) = Some(reason.to_string());
        transport
    }

    /// Publishes to `subject` fail.
    pub fn fail_subject(&self, subject: &str) {
        lock(&self.state.failing_subjects).insert(subject.to_string());
    }

    /// Publishes to `subject` never settle.
    pub fn hang_subject(&self, subject: &str) {
        lock(&self.state.hanging_subjects).insert(subject.to_string());
    }

    /// `close` fails with `reason`.
    pub fn fail_close(&self, reason: &str) {
        *lock(&self.state.close_error) = Some(reason.to_string());
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.state.published).clone()
    }

    pub fn published_to(&self, subject: &str) -> Vec<PublishedMessage> {
        lock(&self.state.published)
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.state.published).clear();
        self.state.attempts.store(0, Ordering::SeqCst);
    }

    /// Every publish call, including failed ones.
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` messages were accepted.
    pub async fn wait_for_published(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.state.notify.notified();
            if lock(&self.state.published).len() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return lock(&self.state.published).len() >= count;
            }
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        if let Some(reason) = lock(&self.state.connect_error).clone() {
            return Err(anyhow!("connection refused: {}", reason));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockConnection {
    state: Arc<MockTransportState>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);

        if lock(&self.state.hanging_subjects).contains(subject) {
            std::future::pending::<()>().await;
        }
        if lock(&self.state.failing_subjects).contains(subject) {
            return Err(anyhow!("publish to {} rejected", subject));
        }

        debug!("MockTransport: {} bytes to {}", payload.len(), subject);
        lock(&self.state.published).push(PublishedMessage {
            subject: subject.to_string(),
            payload,
        });
        self.state.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        match lock(&self.state.close_error).clone() {
            Some(reason) => Err(anyhow!("close failed: {}", reason)),
            None => Ok(()),
        }
    }
}

/// Summary of a tick seen by [`RecordingDiagnostics`].
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub timestamp: DateTime<Utc>,
    pub attempted: usize,
    pub succeeded: usize,
    pub suppressed: usize,
    pub skipped: usize,
    pub failed: bool,
}

#[derive(Default)]
struct RecordingState {
    ticks: Mutex<Vec<TickSummary>>,
    tick_failures: Mutex<Vec<String>>,
    metric_failures: Mutex<Vec<String>>,
    notify: Notify,
}

/// Diagnostics sink that keeps everything it is told.
#[derive(Clone, Default)]
pub struct RecordingDiagnostics {
    state: Arc<RecordingState>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> Vec<TickSummary> {
        lock(&self.state.ticks).clone()
    }

    pub fn tick_failures(&self) -> Vec<String> {
        lock(&self.state.tick_failures).clone()
    }

    pub fn metric_failures(&self) -> Vec<String> {
        lock(&self.state.metric_failures).clone()
    }

    /// Waits until at least `count` ticks completed.
    pub async fn wait_for_ticks(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.state.notify.notified();
            if lock(&self.state.ticks).len() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return lock(&self.state.ticks).len() >= count;
            }
        }
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn metric_failed(&self, error: &ReportingError) {
        lock(&self.state.metric_failures).push(error.to_string());
    }

    fn tick_completed(&self, report: &TickReport) {
        lock(&self.state.ticks).push(TickSummary {
            timestamp: report.timestamp,
            attempted: report.attempted(),
            succeeded: report.succeeded(),
            suppressed: report.suppressed,
            skipped: report.skipped,
            failed: report.is_failed(),
        });
        // tick_failed follows for failing ticks; only wake waiters once it is in
        if !report.is_failed() {
            self.state.notify.notify_waiters();
        }
    }

    fn tick_failed(&self, error: &ReportingError) {
        lock(&self.state.tick_failures).push(error.to_string());
        if let ReportingError::TickFailed { failures, .. } = error {
            lock(&self.state.tick_failures).extend(failures.iter().map(|f| f.to_string()));
        }
        self.state.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_records_and_fails() {
        let transport = MockTransport::new();
        transport.fail_subject("bad");

        let connection = transport.connect().await.unwrap();
        connection.publish("good", b"{}".to_vec()).await.unwrap();
        assert!(connection.publish("bad", b"{}".to_vec()).await.is_err());

        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.published_to("good").len(), 1);
        assert!(transport.published_to("bad").is_empty());
        assert!(transport.wait_for_published(1, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_unreachable_transport() {
        let transport = MockTransport::unreachable("nats://nowhere:4222");
        let err = transport.connect().await.err().unwrap();
        assert!(err.to_string().contains("nowhere"));
        assert_eq!(transport.connect_count(), 0);
    }
}
