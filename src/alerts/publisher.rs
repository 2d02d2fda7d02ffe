//! Outbound alert publishing
//!
//! Alerts are published in serialized form to a fixed alerts channel with a
//! fixed routing key, independent of the channel the triggering message
//! arrived on.

use super::Alert;

/// Routing key every published alert is sent with
pub const ALERTS_ROUTING_KEY: &str = "alerts.routing";

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Broker error: {0}")]
    Broker(String),
}

/// Outbound channel for serialized alerts
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: &Alert) -> Result<(), PublishError>;
}

/// Publisher that logs alerts instead of sending them anywhere.
///
/// Stands in for the broker when none is configured.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl AlertPublisher for LogPublisher {
    fn publish(&self, alert: &Alert) -> Result<(), PublishError> {
        let payload = serde_json::to_string(alert)?;
        tracing::warn!(
            alert_id = %alert.id,
            routing_key = ALERTS_ROUTING_KEY,
            "Alert: {}",
            payload
        );
        Ok(())
    }
}

#[cfg(feature = "kafka")]
mod kafka {
    use std::time::Duration;

    use rdkafka::config::ClientConfig;
    use rdkafka::error::KafkaError;
    use rdkafka::producer::{BaseProducer, BaseRecord, Producer};

    use super::{Alert, AlertPublisher, PublishError, ALERTS_ROUTING_KEY};

    /// Publishes serialized alerts to a fixed Kafka topic
    pub struct KafkaPublisher {
        producer: BaseProducer,
        topic: String,
    }

    impl KafkaPublisher {
        pub fn new(brokers: &str, topic: impl Into<String>) -> Result<Self, KafkaError> {
            let producer: BaseProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .create()?;
            Ok(Self {
                producer,
                topic: topic.into(),
            })
        }
    }

    impl AlertPublisher for KafkaPublisher {
        fn publish(&self, alert: &Alert) -> Result<(), PublishError> {
            let payload = serde_json::to_string(alert)?;
            self.producer
                .send(
                    BaseRecord::to(&self.topic)
                        .key(ALERTS_ROUTING_KEY)
                        .payload(&payload),
                )
                .map_err(|(e, _)| PublishError::Broker(e.to_string()))?;
            self.producer.poll(Duration::from_millis(0));
            Ok(())
        }
    }

    impl Drop for KafkaPublisher {
        fn drop(&mut self) {
            // best effort to drain in-flight messages
            let _ = self.producer.flush(Duration::from_secs(5));
        }
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;
