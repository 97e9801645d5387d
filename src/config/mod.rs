//! Configuration module.
//!
//! Structured configuration loaded from environment variables, split into the
//! NATS connection and the reporter itself.

mod nats_config;
mod reporter_config;

pub use nats_config::{DEFAULT_NATS_URL, NatsEnvConfig, parse_servers};
pub use reporter_config::ReporterEnvConfig;

use crate::application::options::ReporterOptions;
use anyhow::Result;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub nats: NatsEnvConfig,
    pub reporter: ReporterEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Ok(Config {
            nats: NatsEnvConfig::from_env()?,
            reporter: ReporterEnvConfig::from_env()?,
        })
    }

    pub fn reporter_options(&self) -> ReporterOptions {
        self.reporter.to_options()
    }
}
