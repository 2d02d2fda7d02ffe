//! Alert records and dispatch
//!
//! An alert is created by a detector for an out-of-range reading, persisted
//! once, published to the outbound alerts channel, and never mutated.

pub mod dispatcher;
pub mod publisher;

pub use dispatcher::AlertDispatcher;
#[cfg(feature = "kafka")]
pub use publisher::KafkaPublisher;
pub use publisher::{AlertPublisher, LogPublisher, PublishError, ALERTS_ROUTING_KEY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A detected out-of-range metric reading
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub module: String,
    pub metric: String,
    /// The observed reading
    pub value: f64,
    /// Bounds of the violated range at detection time
    pub threshold_min: Option<f64>,
    pub threshold_max: Option<f64>,
    pub description: String,
}

impl Alert {
    pub fn new(
        module: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        threshold_min: Option<f64>,
        threshold_max: Option<f64>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            module: module.into(),
            metric: metric.into(),
            value,
            threshold_min,
            threshold_max,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alerts_get_unique_ids() {
        let a = Alert::new("m", "temperature", 20.0, None, Some(10.0), "high");
        let b = Alert::new("m", "temperature", 20.0, None, Some(10.0), "high");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serialized_field_names() {
        let alert = Alert::new("m", "humidity", 85.5, Some(20.0), Some(60.0), "out of range");
        let json = serde_json::to_value(&alert).unwrap();

        assert!(json.get("occurredAt").is_some());
        assert_eq!(json["thresholdMin"], serde_json::json!(20.0));
        assert_eq!(json["thresholdMax"], serde_json::json!(60.0));
        assert_eq!(json["value"], serde_json::json!(85.5));
    }
}
