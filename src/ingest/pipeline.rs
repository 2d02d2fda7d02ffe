//! Per-message ingestion pipeline
//!
//! One inbound message flows audit -> canonicalize -> detect -> dispatch.
//! Every stage isolates its own failures: an audit write failure does not
//! stop the pipeline, a payload that cannot be canonicalized is classified
//! against its audit record and dropped, and detection/dispatch failures
//! are contained by their registries. No stage retries; broker redelivery
//! is the only retry mechanism.

use std::sync::Arc;

use serde_json::json;

use crate::alerts::AlertDispatcher;
use crate::detect::DetectorRegistry;
use crate::preprocess::{ChannelMeta, PreprocessorRegistry};
use crate::storage::AuditRepository;

/// Terminal result of processing one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The pipeline ran to completion
    Processed { alerts: usize },
    /// The payload could not be canonicalized; detection was skipped
    Malformed,
}

pub struct EventPipeline {
    audit: Arc<dyn AuditRepository>,
    preprocessors: PreprocessorRegistry,
    detectors: DetectorRegistry,
    dispatcher: AlertDispatcher,
}

impl EventPipeline {
    pub fn new(
        audit: Arc<dyn AuditRepository>,
        preprocessors: PreprocessorRegistry,
        detectors: DetectorRegistry,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            audit,
            preprocessors,
            detectors,
            dispatcher,
        }
    }

    /// Process one raw broker message through the full pipeline.
    pub fn handle(&self, raw: &[u8], meta: &ChannelMeta) -> IngestOutcome {
        let payload = String::from_utf8_lossy(raw);
        let channel = meta.channel();
        tracing::debug!(channel, "Received raw message");

        let audit_id = match self.audit.record(&payload) {
            Ok(id) => {
                tracing::debug!(audit_id = %id, "Persisted raw event");
                Some(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist raw event");
                None
            }
        };

        let preprocessor = self.preprocessors.resolve(channel);
        let event = match preprocessor.preprocess(&payload, meta) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(channel, error = %e, "Failed to canonicalize raw event");
                if let Some(id) = audit_id {
                    let classification = json!({
                        "status": "canonicalization_failed",
                        "message": e.to_string(),
                    });
                    if let Err(e) = self.audit.classify(id, &classification) {
                        tracing::error!(
                            audit_id = %id,
                            error = %e,
                            "Failed to record failure classification"
                        );
                    }
                }
                return IngestOutcome::Malformed;
            }
        };

        if let Some(id) = audit_id {
            let mut keys: Vec<&str> = event.payload.keys().map(String::as_str).collect();
            keys.sort_unstable();
            let classification = json!({
                "eventType": event.event_type,
                "channel": event.channel,
                "timestamp": event.timestamp.to_rfc3339(),
                "payloadKeys": keys,
            });
            if let Err(e) = self.audit.classify(id, &classification) {
                tracing::error!(audit_id = %id, error = %e, "Failed to record classification");
            }
        }

        let alerts = self.detectors.run_all(&event);
        self.dispatcher.dispatch_all(&alerts);

        IngestOutcome::Processed {
            alerts: alerts.len(),
        }
    }
}
