use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Channel metadata delivered alongside a raw broker message
#[derive(Debug, Clone, Default)]
pub struct ChannelMeta {
    /// Routing key the message was published with, if the transport has one
    pub routing_key: Option<String>,
    /// Queue or topic the message was consumed from
    pub queue: Option<String>,
}

impl ChannelMeta {
    /// The channel identifier: routing key, else queue, else `"unknown"`
    pub fn channel(&self) -> &str {
        self.routing_key
            .as_deref()
            .or(self.queue.as_deref())
            .unwrap_or("unknown")
    }
}

/// Normalized in-memory representation of an inbound message.
///
/// Created once per message by a preprocessor, read by detectors, and
/// discarded after detection. Never mutated.
#[derive(Debug, Clone)]
pub struct CanonicalEvent {
    /// The channel the message arrived on
    pub channel: String,
    /// Declared event type, or the preprocessor's default
    pub event_type: String,
    /// Payload timestamp, or receipt time when absent/unparseable
    pub timestamp: DateTime<Utc>,
    /// Metric/field name to scalar value
    pub payload: HashMap<String, serde_json::Value>,
}
