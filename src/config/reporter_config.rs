//! Reporting cadence and payload settings parsed from environment variables.

use crate::application::options::ReporterOptions;
use crate::domain::identity::{Tags, parse_tags};
use crate::domain::time_unit::TimeUnit;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

/// Reporter environment configuration
#[derive(Debug, Clone)]
pub struct ReporterEnvConfig {
    pub report_interval: u64,
    pub time_unit: TimeUnit,
    pub min_reporting_timeout: Duration,
    pub with_buckets: bool,
    pub tags: Tags,
    pub publish_timeout: Option<Duration>,
}

impl Default for ReporterEnvConfig {
    fn default() -> Self {
        let options = ReporterOptions::default();
        Self {
            report_interval: options.report_interval,
            time_unit: options.time_unit,
            min_reporting_timeout: options.min_reporting_timeout,
            with_buckets: options.with_buckets,
            tags: options.tags,
            publish_timeout: options.publish_timeout,
        }
    }
}

impl ReporterEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let report_interval = match lookup("REPORT_INTERVAL") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("Failed to parse REPORT_INTERVAL")?,
            None => defaults.report_interval,
        };
        if report_interval == 0 {
            anyhow::bail!("REPORT_INTERVAL must be greater than zero");
        }

        let time_unit = match lookup("REPORT_TIME_UNIT") {
            Some(raw) => TimeUnit::from_str(&raw).context("Failed to parse REPORT_TIME_UNIT")?,
            None => defaults.time_unit,
        };

        let min_reporting_timeout = match lookup("MIN_REPORTING_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .context("Failed to parse MIN_REPORTING_TIMEOUT_SECS")?,
            ),
            None => defaults.min_reporting_timeout,
        };

        let tags = match lookup("REPORT_TAGS") {
            Some(raw) => parse_tags(&raw).context("Failed to parse REPORT_TAGS")?,
            None => defaults.tags,
        };

        let publish_timeout = match lookup("PUBLISH_TIMEOUT_MS") {
            Some(raw) => Some(Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .context("Failed to parse PUBLISH_TIMEOUT_MS")?,
            )),
            None => defaults.publish_timeout,
        };

        Ok(Self {
            report_interval,
            time_unit,
            min_reporting_timeout,
            with_buckets: lookup("REPORT_WITH_BUCKETS")
                .and_then(|raw| raw.trim().parse::<bool>().ok())
                .unwrap_or(defaults.with_buckets),
            tags,
            publish_timeout,
        })
    }

    pub fn to_options(&self) -> ReporterOptions {
        ReporterOptions {
            report_interval: self.report_interval,
            time_unit: self.time_unit,
            min_reporting_timeout: self.min_reporting_timeout,
            with_buckets: self.with_buckets,
            tags: self.tags.clone(),
            publish_timeout: self.publish_timeout,
        }
    }
}
