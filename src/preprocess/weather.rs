//! Default canonicalizer for weather telemetry payloads

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{CanonicalEvent, ChannelMeta, PreprocessError, Preprocessor};

/// Event type assumed when the payload does not declare one
const DEFAULT_EVENT_TYPE: &str = "weather";

/// Payload fields the canonical event keeps; everything else is dropped
const RECOGNIZED_FIELDS: [&str; 4] = ["module", "temperature", "humidity", "pressure"];

/// Canonicalizes JSON weather telemetry.
///
/// Keeps only the recognized metric fields, reads `type` and `timestamp`
/// when present, and falls back silently to defaults when they are not.
#[derive(Debug, Default)]
pub struct WeatherPreprocessor;

impl WeatherPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for WeatherPreprocessor {
    fn preprocess(&self, raw: &str, meta: &ChannelMeta) -> Result<CanonicalEvent, PreprocessError> {
        let doc: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| PreprocessError::MalformedPayload(e.to_string()))?;

        let event_type = doc
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_EVENT_TYPE)
            .to_string();

        // Unparseable timestamps are not fatal; receipt time stands in.
        let timestamp = doc
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let mut payload = HashMap::new();
        for field in RECOGNIZED_FIELDS {
            if let Some(value) = doc.get(field) {
                payload.insert(field.to_string(), value.clone());
            }
        }

        Ok(CanonicalEvent {
            channel: meta.channel().to_string(),
            event_type,
            timestamp,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ChannelMeta {
        ChannelMeta {
            routing_key: Some("weather.queue".to_string()),
            queue: None,
        }
    }

    #[test]
    fn test_recognized_fields_kept_others_dropped() {
        let raw = r#"{
            "module": "green-medium",
            "temperature": 21.5,
            "humidity": 40,
            "pressure": 745.2,
            "deviceId": "dev-1234",
            "firmware": "2.1"
        }"#;

        let event = WeatherPreprocessor::new().preprocess(raw, &meta()).unwrap();

        assert_eq!(event.payload.len(), 4);
        assert_eq!(event.payload["module"], serde_json::json!("green-medium"));
        assert_eq!(event.payload["temperature"], serde_json::json!(21.5));
        assert!(!event.payload.contains_key("deviceId"));
        assert!(!event.payload.contains_key("firmware"));
    }

    #[test]
    fn test_event_type_defaults_to_weather() {
        let event = WeatherPreprocessor::new()
            .preprocess(r#"{"temperature": 20.0}"#, &meta())
            .unwrap();
        assert_eq!(event.event_type, "weather");

        let event = WeatherPreprocessor::new()
            .preprocess(r#"{"type": "telemetry", "temperature": 20.0}"#, &meta())
            .unwrap();
        assert_eq!(event.event_type, "telemetry");
    }

    #[test]
    fn test_timestamp_parsed_from_payload() {
        let event = WeatherPreprocessor::new()
            .preprocess(r#"{"timestamp": "2024-03-01T12:00:00Z"}"#, &meta())
            .unwrap();
        assert_eq!(event.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let event = WeatherPreprocessor::new()
            .preprocess(r#"{"timestamp": "yesterday-ish"}"#, &meta())
            .unwrap();
        assert!(event.timestamp >= before);
    }

    #[test]
    fn test_channel_comes_from_metadata() {
        let event = WeatherPreprocessor::new()
            .preprocess("{}", &ChannelMeta::default())
            .unwrap();
        assert_eq!(event.channel, "unknown");

        let event = WeatherPreprocessor::new()
            .preprocess(
                "{}",
                &ChannelMeta {
                    routing_key: None,
                    queue: Some("telemetry".to_string()),
                },
            )
            .unwrap();
        assert_eq!(event.channel, "telemetry");
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let result = WeatherPreprocessor::new().preprocess("not json at all", &meta());
        assert!(matches!(result, Err(PreprocessError::MalformedPayload(_))));
    }
}
