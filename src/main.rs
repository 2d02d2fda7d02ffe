//! Squall Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - SQUALL_HOST: Bind address (default: 0.0.0.0)
//! - SQUALL_PORT: Port number (default: 8080)
//! - SQUALL_DATA_DIR: Directory for file-backed storage (default: in-memory)
//! - RUST_LOG: Log level (default: info)
//!
//! Broker ingest (requires the `kafka` feature; disabled when KAFKA_TOPICS
//! is unset):
//! - KAFKA_BROKERS / KAFKA_TOPICS / KAFKA_GROUP_ID: consumer configuration
//! - KAFKA_ALERTS_TOPIC: outbound alerts topic (default: alerts)
//! - SEED_ENABLED / SEED_TOPIC / SEED_INTERVAL_MS / SEED_MODULES: synthetic
//!   telemetry seeder

use std::sync::Arc;

use squall::alerts::{AlertDispatcher, AlertPublisher, LogPublisher};
use squall::api::{run_server, AppState, ServerConfig};
use squall::detect::{Detector, DetectorRegistry, ThresholdDetector};
use squall::ingest::EventPipeline;
use squall::preprocess::{Preprocessor, PreprocessorRegistry, WeatherPreprocessor};
use squall::storage::{
    AlertRepository, AuditRepository, FileAlertRepository, FileAuditRepository,
    FileThresholdRepository, MemoryAlertRepository, MemoryAuditRepository,
    MemoryThresholdRepository, ThresholdRepository,
};
use squall::thresholds::ThresholdStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Repositories = (
    Arc<dyn ThresholdRepository>,
    Arc<dyn AlertRepository>,
    Arc<dyn AuditRepository>,
);

fn build_repositories() -> Result<Repositories, Box<dyn std::error::Error>> {
    match std::env::var("SQUALL_DATA_DIR") {
        Ok(dir) => {
            let dir = std::path::PathBuf::from(dir);
            std::fs::create_dir_all(&dir)?;
            tracing::info!("Using file-backed storage at {}", dir.display());
            Ok((
                Arc::new(FileThresholdRepository::new(dir.join("thresholds.json"))),
                Arc::new(FileAlertRepository::new(dir.join("alerts.jsonl"))),
                Arc::new(FileAuditRepository::new(dir.join("audit.jsonl"))),
            ))
        }
        Err(_) => {
            tracing::info!("Using in-memory storage (set SQUALL_DATA_DIR to persist)");
            Ok((
                Arc::new(MemoryThresholdRepository::new()),
                Arc::new(MemoryAlertRepository::new()),
                Arc::new(MemoryAuditRepository::new()),
            ))
        }
    }
}

#[cfg(feature = "kafka")]
fn build_publisher() -> Arc<dyn AlertPublisher> {
    if let Ok(brokers) = std::env::var("KAFKA_BROKERS") {
        let topic =
            std::env::var("KAFKA_ALERTS_TOPIC").unwrap_or_else(|_| "alerts".to_string());
        match squall::alerts::KafkaPublisher::new(&brokers, &topic) {
            Ok(publisher) => {
                tracing::info!(topic = %topic, "Publishing alerts to Kafka");
                return Arc::new(publisher);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Kafka publisher, logging alerts instead");
            }
        }
    }
    Arc::new(LogPublisher::new())
}

#[cfg(not(feature = "kafka"))]
fn build_publisher() -> Arc<dyn AlertPublisher> {
    Arc::new(LogPublisher::new())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "squall=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("SQUALL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("SQUALL_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let (threshold_repo, alert_repo, audit_repo) = build_repositories()?;

    // Populate the threshold cache before any worker can read it
    let thresholds = Arc::new(ThresholdStore::new(Arc::clone(&threshold_repo)));
    thresholds.load();

    // An empty preprocessor registry is the one fatal misconfiguration
    let preprocessors = PreprocessorRegistry::new(vec![(
        Arc::new(WeatherPreprocessor::new()) as Arc<dyn Preprocessor>,
        vec!["*".to_string()],
    )])?;

    let detectors = DetectorRegistry::new(vec![Arc::new(ThresholdDetector::new(Arc::clone(
        &thresholds,
    ))) as Arc<dyn Detector>]);

    let dispatcher = AlertDispatcher::new(Arc::clone(&alert_repo), build_publisher());

    let pipeline = Arc::new(EventPipeline::new(
        Arc::clone(&audit_repo),
        preprocessors,
        detectors,
        dispatcher,
    ));

    #[cfg(feature = "kafka")]
    let consumer_handle = match squall::ingest::KafkaConfig::from_env() {
        Some(config) => {
            let consumer = squall::ingest::KafkaConsumer::new(config, Arc::clone(&pipeline))?;
            consumer.subscribe()?;
            Some(consumer.start())
        }
        None => {
            tracing::info!("KAFKA_TOPICS not set, broker ingest disabled");
            None
        }
    };

    #[cfg(feature = "kafka")]
    let seeder = match squall::seed::SeedConfig::from_env() {
        Some(config) => {
            let worker = Arc::new(squall::seed::SeedWorker::new(config)?);
            let handle = Arc::clone(&worker).start();
            Some((worker, handle))
        }
        None => None,
    };

    let state = Arc::new(AppState {
        thresholds,
        alerts: alert_repo,
        audit: audit_repo,
        pipeline,
    });

    println!(
        r#"
                        _ _
  ___  __ _ _   _  __ _| | |
 / __|/ _` | | | |/ _` | | |
 \__ \ (_| | |_| | (_| | | |
 |___/\__, |\__,_|\__,_|_|_|
         |_|

 Telemetry Threshold Alerting Service
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(ServerConfig { host, port }, state).await?;

    // Graceful drain: stop feeding the pipeline, let in-flight work finish
    #[cfg(feature = "kafka")]
    {
        if let Some(handle) = consumer_handle {
            handle.stop().await;
        }
        if let Some((worker, handle)) = seeder {
            worker.stop();
            let _ = handle.await;
        }
    }

    Ok(())
}
