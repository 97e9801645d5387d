//! Subject resolution strategies.

use crate::domain::envelope::ReportEnvelope;
use crate::domain::ports::SubjectResolver;
use anyhow::Result;
use async_trait::async_trait;

pub const DEFAULT_SUBJECT: &str = "DEFAULT_NATS_SUBJECT";

/// Sends every metric to the same subject.
#[derive(Debug, Clone)]
pub struct FixedSubjectResolver {
    subject: String,
}

impl FixedSubjectResolver {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

impl Default for FixedSubjectResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT)
    }
}

#[async_trait]
impl SubjectResolver for FixedSubjectResolver {
    async fn resolve(&self, _envelope: &ReportEnvelope) -> Result<String> {
        Ok(self.subject.clone())
    }
}

/// Builds a per-metric subject from a template.
///
/// Supported placeholders: `{type}`, `{name}`, `{group}` (empty when the
/// metric has no group) and `{tag:KEY}`. A `{tag:KEY}` whose tag is missing
/// fails resolution for that metric, as does a substituted value containing a
/// token separator (`.`), whitespace or a wildcard (`*`, `>`).
#[derive(Debug, Clone)]
pub struct TemplateSubjectResolver {
    template: String,
}

impl TemplateSubjectResolver {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, envelope: &ReportEnvelope) -> Result<String> {
        let mut subject = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            subject.push_str(&rest[..start]);
            let Some(len) = rest[start..].find('}') else {
                anyhow::bail!("Unclosed placeholder in subject template '{}'", self.template);
            };
            let placeholder = &rest[start + 1..start + len];
            match placeholder {
                "type" => subject.push_str(envelope.metric_type.as_str()),
                "name" => push_token(&mut subject, placeholder, &envelope.name)?,
                "group" => push_token(
                    &mut subject,
                    placeholder,
                    envelope.group.as_deref().unwrap_or_default(),
                )?,
                other => match other.strip_prefix("tag:") {
                    Some(key) => match envelope.tags.get(key) {
                        Some(value) => push_token(&mut subject, placeholder, value)?,
                        None => anyhow::bail!(
                            "Tag '{}' required by subject template is missing on {}",
                            key,
                            envelope.qualified_name()
                        ),
                    },
                    None => anyhow::bail!("Unknown subject placeholder '{{{}}}'", other),
                },
            }
            rest = &rest[start + len + 1..];
        }
        subject.push_str(rest);

        Ok(subject)
    }
}

/// Appends a substituted value, refusing anything that would change the
/// subject's token structure.
fn push_token(subject: &mut String, placeholder: &str, value: &str) -> Result<()> {
    if let Some(bad) = value
        .chars()
        .find(|c| matches!(c, '.' | '*' | '>') || c.is_whitespace())
    {
        anyhow::bail!(
            "Value '{}' for {{{}}} contains '{}', which is not allowed in a subject token",
            value,
            placeholder,
            bad
        );
    }
    subject.push_str(value);
    Ok(())
}

#[async_trait]
impl SubjectResolver for TemplateSubjectResolver {
    async fn resolve(&self, envelope: &ReportEnvelope) -> Result<String> {
        self.render(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::MetricIdentity;
    use crate::domain::kind::MetricKind;
    use crate::domain::values::{CounterValue, ValueRecord};
    use chrono::Utc;

    fn envelope(identity: MetricIdentity) -> ReportEnvelope {
        let tags = identity.tags.clone();
        ReportEnvelope::assemble(
            &identity,
            MetricKind::Counter,
            Utc::now(),
            tags,
            ValueRecord::Counter(CounterValue { count: 1 }),
        )
    }

    #[tokio::test]
    async fn test_fixed_resolver_defaults() {
        let resolver = FixedSubjectResolver::default();
        let subject = resolver
            .resolve(&envelope(MetricIdentity::new("a")))
            .await
            .unwrap();
        assert_eq!(subject, DEFAULT_SUBJECT);
    }

    #[tokio::test]
    async fn test_template_resolver_substitutes_placeholders() {
        let resolver = TemplateSubjectResolver::new("metrics.{tag:env}.{type}.{group}.{name}");
        let identity = MetricIdentity::new("hits")
            .with_group("cache")
            .with_tag("env", "prod");

        let subject = resolver.resolve(&envelope(identity)).await.unwrap();
        assert_eq!(subject, "metrics.prod.counter.cache.hits");
    }

    #[test]
    fn test_template_resolver_errors() {
        let identity = MetricIdentity::new("hits");
        assert!(
            TemplateSubjectResolver::new("m.{tag:env}")
                .render(&envelope(identity.clone()))
                .is_err()
        );
        assert!(
            TemplateSubjectResolver::new("m.{bogus}")
                .render(&envelope(identity.clone()))
                .is_err()
        );
        assert!(
            TemplateSubjectResolver::new("m.{name")
                .render(&envelope(identity))
                .is_err()
        );
    }

    #[test]
    fn test_template_rejects_values_that_break_tokens() {
        let resolver = TemplateSubjectResolver::new("metrics.{tag:host}.{name}");
        for host in ["web.1", "web 1", "*", "web>"] {
            let identity = MetricIdentity::new("hits").with_tag("host", host);
            let error = resolver.render(&envelope(identity)).unwrap_err();
            assert!(error.to_string().contains("{tag:host}"), "{}", error);
        }

        let dotted_name = MetricIdentity::new("http.hits").with_tag("host", "web-1");
        assert!(resolver.render(&envelope(dotted_name)).is_err());

        let plain = MetricIdentity::new("hits").with_tag("host", "web-1");
        assert_eq!(resolver.render(&envelope(plain)).unwrap(), "metrics.web-1.hits");
    }
}
