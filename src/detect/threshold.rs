//! Threshold detector: compares known metrics against configured ranges

use std::sync::Arc;

use serde_json::Value;

use super::{Detector, DetectorError};
use crate::alerts::Alert;
use crate::preprocess::CanonicalEvent;
use crate::thresholds::ThresholdStore;

/// Metrics this detector knows how to evaluate
const METRICS: [&str; 3] = ["temperature", "humidity", "pressure"];

/// Emits one alert per metric whose reading falls outside its configured
/// range. Metrics without a configured range, and readings that cannot be
/// coerced to a number, are skipped silently.
pub struct ThresholdDetector {
    thresholds: Arc<ThresholdStore>,
}

impl ThresholdDetector {
    pub fn new(thresholds: Arc<ThresholdStore>) -> Self {
        Self { thresholds }
    }

    fn check_metric(&self, module: &str, metric: &str, value: f64, alerts: &mut Vec<Alert>) {
        let Some(range) = self.thresholds.get(module, metric) else {
            return;
        };

        let low = range.min.is_some_and(|min| value < min);
        let high = range.max.is_some_and(|max| value > max);

        if low || high {
            let description = format!(
                "{} {} out of range (value={:.2}, min={}, max={})",
                module,
                metric,
                value,
                fmt_bound(range.min),
                fmt_bound(range.max)
            );
            tracing::debug!("Detected threshold violation: {}", description);
            alerts.push(Alert::new(
                module,
                metric,
                value,
                range.min,
                range.max,
                description,
            ));
        }
    }
}

impl Detector for ThresholdDetector {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn detect(&self, event: &CanonicalEvent) -> Result<Vec<Alert>, DetectorError> {
        let mut alerts = Vec::new();
        let module = module_for(event);

        for metric in METRICS {
            let Some(raw) = event.payload.get(metric) else {
                continue;
            };
            let Some(value) = coerce_f64(raw) else {
                continue;
            };
            self.check_metric(&module, metric, value, &mut alerts);
        }

        Ok(alerts)
    }
}

/// Formats an optional threshold bound as its number, or `null` when unset.
fn fmt_bound(bound: Option<f64>) -> String {
    match bound {
        Some(n) => n.to_string(),
        None => "null".to_string(),
    }
}

/// Payload `module` field when present and non-blank, else the channel
fn module_for(event: &CanonicalEvent) -> String {
    match event.payload.get("module") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        // blank strings and nulls fall back to the channel
        Some(Value::String(_)) | Some(Value::Null) | None => event.channel.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numbers pass through; strings are parsed. Anything else, or a reading
/// that coerces to NaN, is treated as "no metric present".
fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (!n.is_nan()).then_some(n)
}
