//! NATS metrics reporter demo.
//!
//! Registers a handful of metrics, simulates traffic against them and
//! publishes their snapshots to NATS until Ctrl+C.
//!
//! # Usage
//! ```sh
//! NATS_URL=nats://127.0.0.1:4222 cargo run -- --subject 'metrics.{type}.{name}'
//! ```
//!
//! # Environment Variables
//! - `NATS_URL` - Comma-separated server list (default: nats://127.0.0.1:4222)
//! - `NATS_SUBJECT` - Subject or `{type}`/`{name}`/`{group}`/`{tag:KEY}` template
//! - `REPORT_INTERVAL` / `REPORT_TIME_UNIT` - Tick period (default: 1000 ms)
//! - `REPORT_TAGS` - Tags added to every metric, as `key=value,key2=value2`

use anyhow::Result;
use clap::Parser;
use nats_metrics_reporter::application::MetricReporter;
use nats_metrics_reporter::application::subject_resolver::{
    FixedSubjectResolver, TemplateSubjectResolver,
};
use nats_metrics_reporter::config::{Config, parse_servers};
use nats_metrics_reporter::domain::event::Event;
use nats_metrics_reporter::domain::identity::MetricIdentity;
use nats_metrics_reporter::domain::ports::SubjectResolver;
use nats_metrics_reporter::infrastructure::nats::NatsTransport;
use nats_metrics_reporter::infrastructure::registry::{
    Counter, Histogram, InMemoryRegistry, Meter, Timer, ValueGauge,
};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Overrides NATS_URL
    #[arg(long)]
    nats_url: Option<String>,

    /// Overrides NATS_SUBJECT
    #[arg(long)]
    subject: Option<String>,

    /// Overrides REPORT_INTERVAL, in the configured time unit
    #[arg(long)]
    interval: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    run_for_secs: Option<u64>,
}

/// Handles the simulated workload writes to.
struct DemoMetrics {
    requests: Arc<Counter>,
    in_flight: Arc<ValueGauge>,
    payload_size: Arc<Histogram>,
    throughput: Arc<Meter>,
    latency: Arc<Timer>,
}

impl DemoMetrics {
    fn register(registry: &InMemoryRegistry) -> Result<Self> {
        Ok(Self {
            requests: registry.counter(MetricIdentity::new("requests").with_group("http"))?,
            in_flight: registry.gauge(MetricIdentity::new("in_flight").with_group("http"))?,
            payload_size: registry.histogram(
                MetricIdentity::new("payload_size").with_group("http"),
                Some(vec![256.0, 1024.0, 4096.0, 16384.0]),
            )?,
            throughput: registry.meter(MetricIdentity::new("throughput").with_group("http"))?,
            latency: registry.timer(
                MetricIdentity::new("latency")
                    .with_group("http")
                    .with_tag("route", "/orders"),
                None,
            )?,
        })
    }

    fn simulate(&self) -> Result<()> {
        let mut rng = rand::rng();
        let batch = rng.random_range(1..20);
        for _ in 0..batch {
            self.payload_size.update(rng.random_range(64.0..20_000.0));
            self.latency
                .update(Duration::from_micros(rng.random_range(200..50_000)));
        }
        self.requests.increment(batch);
        self.throughput.mark(batch as u64);
        self.in_flight.set(&rng.random_range(0..32))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    info!("NATS metrics reporter {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(url) = cli.nats_url {
        config.nats.servers = parse_servers(&url);
    }
    if let Some(subject) = cli.subject {
        config.nats.subject = subject;
    }
    if let Some(interval) = cli.interval {
        config.reporter.report_interval = interval.max(1);
    }
    info!(
        "Configuration loaded: servers={:?}, subject={}, interval={:?}",
        config.nats.servers,
        config.nats.subject,
        config.reporter_options().interval()
    );

    let registry = Arc::new(InMemoryRegistry::new());
    let metrics = DemoMetrics::register(&registry)?;

    let resolver: Arc<dyn SubjectResolver> = if config.nats.subject.contains('{') {
        Arc::new(TemplateSubjectResolver::new(config.nats.subject.clone()))
    } else {
        Arc::new(FixedSubjectResolver::new(config.nats.subject.clone()))
    };
    let transport = Arc::new(NatsTransport::new(&config.nats)?);

    let reporter = MetricReporter::builder(registry.clone(), transport)
        .options(config.reporter_options())
        .subject_resolver(resolver)
        .build();

    reporter.start().await?;

    let startup = Event::new(
        "startup",
        json!({ "version": env!("CARGO_PKG_VERSION"), "metrics": registry.len() }),
    )
    .with_description("Reporter process started");
    if let Err(e) = reporter.report_event(startup).await {
        warn!("Failed to report startup event: {}", e);
    }

    let deadline = async {
        match cli.run_for_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut traffic = tokio::time::interval(Duration::from_millis(250));
    info!("Reporter running. Press Ctrl+C to shutdown.");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received.");
                break;
            }
            _ = &mut deadline => {
                info!("Run duration elapsed.");
                break;
            }
            _ = traffic.tick() => metrics.simulate()?,
        }
    }

    reporter.stop().await?;
    info!("Reporter stopped. Exiting...");
    Ok(())
}
