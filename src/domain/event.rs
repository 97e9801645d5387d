use crate::domain::identity::{MetricIdentity, Tags};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A point-in-time domain event reported outside the tick schedule.
///
/// Events are published as a single `gauge` envelope whose value is the
/// event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    pub name: String,
    pub group: Option<String>,
    pub description: Option<String>,
    pub time: DateTime<Utc>,
    pub tags: Tags,
    pub value: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            group: None,
            description: None,
            time: Utc::now(),
            tags: Tags::new(),
            value,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn identity(&self) -> MetricIdentity {
        MetricIdentity {
            name: self.name.clone(),
            group: self.group.clone(),
            tags: self.tags.clone(),
        }
    }
}
