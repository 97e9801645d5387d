//! NATS transport built on `async-nats`.

use crate::config::NatsEnvConfig;
use crate::domain::ports::{Connection, Transport};
use anyhow::{Context, Result};
use async_nats::jetstream;
use async_nats::{Client, ConnectOptions, ServerAddr};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How a publish is considered settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatsDelivery {
    /// Core NATS: settled once the message is handed to the client.
    Core,
    /// JetStream: settled once the stream acknowledged the message.
    JetStream,
}

pub struct NatsTransport {
    servers: Vec<ServerAddr>,
    client_name: String,
    connect_timeout: Duration,
    delivery: NatsDelivery,
}

impl NatsTransport {
    pub fn new(config: &NatsEnvConfig) -> Result<Self> {
        let servers = config
            .servers
            .iter()
            .map(|url| {
                url.parse::<ServerAddr>()
                    .with_context(|| format!("Invalid NATS server address: {}", url))
            })
            .collect::<Result<Vec<_>>>()?;
        if servers.is_empty() {
            anyhow::bail!("At least one NATS server address is required");
        }

        Ok(Self {
            servers,
            client_name: config.client_name.clone(),
            connect_timeout: config.connect_timeout,
            delivery: if config.jetstream {
                NatsDelivery::JetStream
            } else {
                NatsDelivery::Core
            },
        })
    }

    pub fn delivery(&self) -> NatsDelivery {
        self.delivery
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        let client = ConnectOptions::new()
            .name(&self.client_name)
            .connection_timeout(self.connect_timeout)
            .connect(self.servers.clone())
            .await
            .with_context(|| format!("Failed to connect to NATS as {}", self.client_name))?;

        info!(
            "NatsTransport: Connected as {} ({:?} delivery)",
            self.client_name, self.delivery
        );

        let jetstream = match self.delivery {
            NatsDelivery::JetStream => Some(jetstream::new(client.clone())),
            NatsDelivery::Core => None,
        };
        Ok(Arc::new(NatsConnection { client, jetstream }))
    }
}

struct NatsConnection {
    client: Client,
    jetstream: Option<jetstream::Context>,
}

#[async_trait]
impl Connection for NatsConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        match &self.jetstream {
            Some(context) => {
                let ack = context
                    .publish(subject.to_string(), payload.into())
                    .await?
                    .await?;
                debug!("NatsTransport: {} acked at seq {}", subject, ack.sequence);
            }
            None => self.client.publish(subject.to_string(), payload.into()).await?,
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .context("Failed to flush pending NATS messages")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(servers: &[&str]) -> NatsEnvConfig {
        NatsEnvConfig {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            ..NatsEnvConfig::default()
        }
    }

    #[test]
    fn test_transport_requires_servers() {
        assert!(NatsTransport::new(&config(&[])).is_err());
    }

    #[test]
    fn test_transport_parses_servers() {
        let transport =
            NatsTransport::new(&config(&["nats://127.0.0.1:4222", "nats://10.0.0.2:4222"]))
                .unwrap();
        assert_eq!(transport.servers.len(), 2);
        assert_eq!(transport.delivery(), NatsDelivery::Core);
    }
}
