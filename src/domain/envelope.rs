use crate::domain::identity::{MetricIdentity, Tags};
use crate::domain::kind::{MetricKind, MetricType};
use crate::domain::values::ValueRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The unit handed to the message builder and the subject resolver.
///
/// `timestamp` is the tick time shared by every metric of the tick, not the
/// time the envelope was serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEnvelope {
    pub name: String,
    pub group: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub tags: Tags,
    pub values: ValueRecord,
    /// Only set for events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReportEnvelope {
    /// Combines a metric's identity with its extracted value.
    ///
    /// `tags` must already be merged with the reporter-level tags.
    pub fn assemble(
        identity: &MetricIdentity,
        kind: MetricKind,
        timestamp: DateTime<Utc>,
        tags: Tags,
        values: ValueRecord,
    ) -> Self {
        Self {
            name: identity.name.clone(),
            group: identity.group.clone(),
            timestamp,
            metric_type: kind.metric_type(),
            tags,
            values,
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Dotted `group.name` form used in log lines and errors.
    pub fn qualified_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{}.{}", group, self.name),
            None => self.name.clone(),
        }
    }
}
