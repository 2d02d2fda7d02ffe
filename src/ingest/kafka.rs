//! Kafka consumer for broker ingest
//!
//! Consumes telemetry from the configured topics and feeds each message
//! through the ingestion pipeline. At-least-once: the offset is committed
//! only after the pipeline has finished with the message, so a crash
//! mid-message leads to redelivery, not loss. A malformed message is
//! terminal (audited and classified), so its offset is committed too.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `KAFKA_BROKERS`: Comma-separated list of brokers (default: localhost:9092)
//! - `KAFKA_TOPICS`: Comma-separated list of topics to consume
//! - `KAFKA_GROUP_ID`: Consumer group ID (default: squall)
//! - `KAFKA_AUTO_OFFSET_RESET`: Where to start if no offset (earliest/latest, default: earliest)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use tokio::sync::mpsc;

use super::pipeline::{EventPipeline, IngestOutcome};
use crate::preprocess::ChannelMeta;

/// Kafka consumer configuration
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Kafka broker addresses
    pub brokers: String,
    /// Topics to consume from
    pub topics: Vec<String>,
    /// Consumer group ID
    pub group_id: String,
    /// Auto offset reset (earliest or latest)
    pub auto_offset_reset: String,
    /// Session timeout in ms
    pub session_timeout_ms: u32,
    /// Max poll interval in ms
    pub max_poll_interval_ms: u32,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topics: vec![],
            group_id: "squall".to_string(),
            auto_offset_reset: "earliest".to_string(),
            session_timeout_ms: 30000,
            max_poll_interval_ms: 300000,
        }
    }
}

impl KafkaConfig {
    /// Create config from environment variables. Returns `None` when
    /// `KAFKA_TOPICS` is unset or empty (broker ingest disabled).
    pub fn from_env() -> Option<Self> {
        let topics = std::env::var("KAFKA_TOPICS").ok()?;
        if topics.trim().is_empty() {
            return None;
        }

        Some(Self {
            brokers: std::env::var("KAFKA_BROKERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            topics: topics
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            group_id: std::env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "squall".to_string()),
            auto_offset_reset: std::env::var("KAFKA_AUTO_OFFSET_RESET")
                .unwrap_or_else(|_| "earliest".to_string()),
            ..Self::default()
        })
    }
}

/// Statistics from the consumer loop
#[derive(Debug, Clone, Default)]
pub struct ConsumerStats {
    pub messages_received: u64,
    pub messages_processed: u64,
    pub messages_malformed: u64,
    pub alerts_emitted: u64,
    pub errors: u64,
    pub last_offset: HashMap<String, i64>,
}

/// Kafka consumer feeding the ingestion pipeline
pub struct KafkaConsumer {
    config: KafkaConfig,
    pipeline: Arc<EventPipeline>,
    consumer: StreamConsumer,
    stats: Arc<parking_lot::RwLock<ConsumerStats>>,
}

/// Handle to a running consumer loop
pub struct ConsumerHandle {
    handle: tokio::task::JoinHandle<()>,
    shutdown_tx: mpsc::Sender<()>,
    stats: Arc<parking_lot::RwLock<ConsumerStats>>,
}

impl ConsumerHandle {
    /// Signal the loop to stop and wait for it to finish the in-flight message
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats.read().clone()
    }
}

impl KafkaConsumer {
    pub fn new(config: KafkaConfig, pipeline: Arc<EventPipeline>) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set(
                "max.poll.interval.ms",
                config.max_poll_interval_ms.to_string(),
            )
            .set("fetch.min.bytes", "1024")
            .set("fetch.max.wait.ms", "100")
            .create()?;

        Ok(Self {
            config,
            pipeline,
            consumer,
            stats: Arc::new(parking_lot::RwLock::new(ConsumerStats::default())),
        })
    }

    /// Subscribe to configured topics
    pub fn subscribe(&self) -> Result<(), KafkaError> {
        let topics: Vec<&str> = self.config.topics.iter().map(|s| s.as_str()).collect();
        self.consumer.subscribe(&topics)?;
        tracing::info!("Subscribed to Kafka topics: {:?}", self.config.topics);
        Ok(())
    }

    /// Start consuming in the background
    pub fn start(self) -> ConsumerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let consumer = self.consumer;
        let pipeline = self.pipeline;
        let stats = Arc::clone(&self.stats);

        let handle = tokio::spawn(async move {
            tracing::info!("Kafka consumer started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Kafka consumer shutting down");
                        break;
                    }
                    result = consumer.recv() => {
                        match result {
                            Ok(message) => {
                                let topic = message.topic().to_string();
                                let partition = message.partition();
                                let offset = message.offset();

                                {
                                    let mut s = stats.write();
                                    s.messages_received += 1;
                                }

                                let meta = ChannelMeta {
                                    routing_key: message
                                        .key()
                                        .and_then(|k| std::str::from_utf8(k).ok())
                                        .map(str::to_string),
                                    queue: Some(topic.clone()),
                                };
                                let raw = message.payload().unwrap_or_default();

                                let outcome = pipeline.handle(raw, &meta);

                                // both outcomes are terminal for the message
                                if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                                    tracing::error!(
                                        topic = %topic,
                                        partition = partition,
                                        offset = offset,
                                        error = %e,
                                        "Failed to commit offset"
                                    );
                                }

                                let mut s = stats.write();
                                match outcome {
                                    IngestOutcome::Processed { alerts } => {
                                        s.messages_processed += 1;
                                        s.alerts_emitted += alerts as u64;
                                    }
                                    IngestOutcome::Malformed => {
                                        s.messages_malformed += 1;
                                    }
                                }
                                s.last_offset
                                    .insert(format!("{}:{}", topic, partition), offset);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Kafka receive error");
                                stats.write().errors += 1;
                                // back off on error
                                tokio::time::sleep(Duration::from_millis(100)).await;
                            }
                        }
                    }
                }
            }
        });

        ConsumerHandle {
            handle,
            shutdown_tx,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kafka_config_default() {
        let config = KafkaConfig::default();
        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.group_id, "squall");
        assert!(config.topics.is_empty());
    }
}
