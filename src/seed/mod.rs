//! Synthetic telemetry seeder
//!
//! Periodically publishes randomized readings to the inbound topic so the
//! pipeline can be exercised without real devices. Runs as an independent
//! background task with its own stop signal, outside the ingest core.
//!
//! Environment variables:
//! - `SEED_ENABLED`: set to `true` to enable
//! - `SEED_TOPIC`: topic to publish to (default: telemetry)
//! - `SEED_INTERVAL_MS`: delay between messages (default: 1000)
//! - `SEED_MODULES`: comma-separated module names to rotate through
//!   (default: green-medium)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};

/// Seeder configuration
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub brokers: String,
    pub topic: String,
    pub interval: Duration,
    pub modules: Vec<String>,
}

impl SeedConfig {
    /// Create config from environment variables. Returns `None` unless
    /// `SEED_ENABLED=true`.
    pub fn from_env() -> Option<Self> {
        let enabled = std::env::var("SEED_ENABLED")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if !enabled {
            return None;
        }

        let interval_ms: u64 = std::env::var("SEED_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let mut modules: Vec<String> = std::env::var("SEED_MODULES")
            .unwrap_or_else(|_| "green-medium".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if modules.is_empty() {
            modules.push("green-medium".to_string());
        }

        Some(Self {
            brokers: std::env::var("KAFKA_BROKERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            topic: std::env::var("SEED_TOPIC").unwrap_or_else(|_| "telemetry".to_string()),
            interval: Duration::from_millis(interval_ms),
            modules,
        })
    }
}

/// Background worker publishing synthetic readings
pub struct SeedWorker {
    producer: BaseProducer,
    config: SeedConfig,
    running: Arc<AtomicBool>,
}

impl SeedWorker {
    pub fn new(config: SeedConfig) -> Result<Self, KafkaError> {
        let producer: BaseProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            config,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start the background worker
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!(
                topic = %self.config.topic,
                "Seeder started with interval {:?}",
                self.config.interval
            );

            let mut interval = tokio::time::interval(self.config.interval);
            let mut sent: u64 = 0;

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;

                match self.send_one(sent + 1) {
                    Ok(()) => {
                        sent += 1;
                        if sent % 10 == 0 {
                            tracing::info!("Sent {} seed messages", sent);
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to send seed message"),
                }
            }

            // drain anything still queued in the producer
            let _ = self.producer.flush(Duration::from_secs(5));
            tracing::info!("Seeder stopped after {} messages", sent);
        })
    }

    /// Stop the worker
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn send_one(&self, id: u64) -> Result<(), KafkaError> {
        let mut rng = rand::thread_rng();
        let module = &self.config.modules[rng.gen_range(0..self.config.modules.len())];

        let payload = serde_json::json!({
            "id": id,
            "type": "telemetry",
            "module": module,
            "deviceId": format!("dev-{}", rng.gen_range(1000..10000)),
            "temperature": 15.0 + rng.gen::<f64>() * 20.0,
            "humidity": 20.0 + rng.gen::<f64>() * 60.0,
            "pressure": 700.0 + rng.gen::<f64>() * 50.0,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
        .to_string();

        self.producer
            .send(
                BaseRecord::to(&self.config.topic)
                    .key(module.as_str())
                    .payload(&payload),
            )
            .map_err(|(e, _)| e)?;
        self.producer.poll(Duration::from_millis(0));
        Ok(())
    }
}
