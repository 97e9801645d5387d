use crate::domain::identity::Tags;
use crate::domain::time_unit::TimeUnit;
use std::time::Duration;

/// Plain-data settings fixed at reporter construction.
#[derive(Debug, Clone)]
pub struct ReporterOptions {
    /// Tick period, in `time_unit`.
    pub report_interval: u64,
    pub time_unit: TimeUnit,
    /// Longest an unchanged metric may go unreported.
    pub min_reporting_timeout: Duration,
    /// Include configured bucket boundaries in histogram and timer values.
    pub with_buckets: bool,
    /// Tags added to every metric; metric tags win on collision.
    pub tags: Tags,
    /// Upper bound on a single publish. `None` waits for the transport.
    pub publish_timeout: Option<Duration>,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            report_interval: 1000,
            time_unit: TimeUnit::Millisecond,
            min_reporting_timeout: Duration::from_secs(60),
            with_buckets: true,
            tags: Tags::new(),
            publish_timeout: None,
        }
    }
}

impl ReporterOptions {
    pub fn interval(&self) -> Duration {
        self.time_unit.duration(self.report_interval)
    }
}
