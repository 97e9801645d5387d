//! NATS connection settings parsed from environment variables.

use crate::application::subject_resolver::DEFAULT_SUBJECT;
use anyhow::{Context, Result};
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";

/// NATS environment configuration
#[derive(Debug, Clone)]
pub struct NatsEnvConfig {
    /// Seed servers; `NATS_URL` accepts a comma-separated list.
    pub servers: Vec<String>,
    pub client_name: String,
    pub connect_timeout: Duration,
    /// Publish through JetStream and wait for the stream ack.
    pub jetstream: bool,
    /// Subject used by the fixed resolver.
    pub subject: String,
}

impl Default for NatsEnvConfig {
    fn default() -> Self {
        Self {
            servers: vec![DEFAULT_NATS_URL.to_string()],
            client_name: format!("metrics-reporter-{}", Uuid::new_v4()),
            connect_timeout: Duration::from_secs(5),
            jetstream: false,
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

impl NatsEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let servers = match lookup("NATS_URL") {
            Some(raw) => parse_servers(&raw),
            None => defaults.servers,
        };
        if servers.is_empty() {
            anyhow::bail!("NATS_URL must name at least one server");
        }

        let connect_timeout = match lookup("NATS_CONNECT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .context("Failed to parse NATS_CONNECT_TIMEOUT_SECS")?,
            ),
            None => defaults.connect_timeout,
        };

        Ok(Self {
            servers,
            client_name: lookup("NATS_CLIENT_NAME").unwrap_or(defaults.client_name),
            connect_timeout,
            jetstream: lookup("NATS_JETSTREAM")
                .and_then(|raw| raw.trim().parse::<bool>().ok())
                .unwrap_or(false),
            subject: lookup("NATS_SUBJECT").unwrap_or(defaults.subject),
        })
    }
}

pub fn parse_servers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_nats_config_defaults() {
        let config = NatsEnvConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.servers, vec![DEFAULT_NATS_URL.to_string()]);
        assert!(config.client_name.starts_with("metrics-reporter-"));
        assert_eq!(config.subject, "DEFAULT_NATS_SUBJECT");
        assert!(!config.jetstream);
    }

    #[test]
    fn test_nats_config_from_vars() {
        let config = NatsEnvConfig::from_lookup(lookup(&[
            ("NATS_URL", "nats://a:4222, nats://b:4222"),
            ("NATS_CLIENT_NAME", "billing"),
            ("NATS_SUBJECT", "metrics.billing"),
            ("NATS_JETSTREAM", "true"),
            ("NATS_CONNECT_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.servers, vec!["nats://a:4222", "nats://b:4222"]);
        assert_eq!(config.client_name, "billing");
        assert_eq!(config.subject, "metrics.billing");
        assert!(config.jetstream);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_empty_server_list_rejected() {
        assert!(NatsEnvConfig::from_lookup(lookup(&[("NATS_URL", " , ")])).is_err());
    }
}
