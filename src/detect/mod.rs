//! Detection of out-of-range readings in canonical events
//!
//! A [`Detector`] inspects a [`CanonicalEvent`] and yields zero or more
//! alerts. The registry runs every registered detector over each event,
//! isolating individual detector failures so one bad detector never
//! suppresses the others.

pub mod threshold;

pub use threshold::ThresholdDetector;

use std::sync::Arc;

use crate::alerts::Alert;
use crate::preprocess::CanonicalEvent;

/// A single detector's failure; contained by the registry
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DetectorError(pub String);

pub trait Detector: Send + Sync {
    /// Name used in logs when this detector fails
    fn name(&self) -> &'static str;

    fn detect(&self, event: &CanonicalEvent) -> Result<Vec<Alert>, DetectorError>;
}

/// Runs all registered detectors over each event.
///
/// The detector list is assembled at startup and read-only afterwards.
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new(detectors: Vec<Arc<dyn Detector>>) -> Self {
        tracing::info!(
            "Detector registry initialized with {} detectors",
            detectors.len()
        );
        Self { detectors }
    }

    /// Run every detector in registration order and concatenate their
    /// alerts. A failing detector is logged and contributes nothing;
    /// remaining detectors still run.
    pub fn run_all(&self, event: &CanonicalEvent) -> Vec<Alert> {
        let mut all = Vec::new();

        for detector in &self.detectors {
            match detector.detect(event) {
                Ok(alerts) => all.extend(alerts),
                Err(e) => {
                    tracing::error!(detector = detector.name(), error = %e, "Detector failed")
                }
            }
        }

        all
    }
}
