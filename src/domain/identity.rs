use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag set attached to a metric or to the reporter.
///
/// Keys are unique and iteration order is sorted, so two tag sets with the
/// same content always serialize the same way.
pub type Tags = BTreeMap<String, String>;

/// Identity of a metric as supplied by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricIdentity {
    pub name: String,
    pub group: Option<String>,
    pub tags: Tags,
}

impl MetricIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            tags: Tags::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Merges reporter-level tags with the metric's own tags.
    ///
    /// Metric tags override reporter tags sharing the same key.
    pub fn merged_tags(&self, reporter_tags: &Tags) -> Tags {
        let mut merged = reporter_tags.clone();
        merged.extend(
            self.tags
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        merged
    }

    /// Dotted `group.name` form used in log lines.
    pub fn qualified_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{}.{}", group, self.name),
            None => self.name.clone(),
        }
    }
}

/// Parses `key=value` pairs separated by commas.
///
/// Blank entries are ignored; an entry without `=` is rejected.
pub fn parse_tags(raw: &str) -> anyhow::Result<Tags> {
    let mut tags = Tags::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((key, value)) = entry.split_once('=') else {
            anyhow::bail!("Invalid tag '{}': expected key=value", entry);
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid tag '{}': empty key", entry);
        }
        tags.insert(key.to_string(), value.trim().to_string());
    }
    Ok(tags)
}
