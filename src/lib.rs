//! Squall: Telemetry Threshold Alerting Service
//!
//! Ingests telemetry messages from a broker (or the HTTP ingest endpoint),
//! normalizes heterogeneous payloads into canonical events, evaluates
//! configured numeric thresholds against the normalized metrics, and
//! persists + publishes alert records when a reading is out of range.
//!
//! # Pipeline
//!
//! ```text
//! raw message -> audit -> preprocess -> detect -> dispatch (persist, publish)
//! ```
//!
//! Each stage isolates its own failures; a bad message, a failing detector,
//! or an unavailable store never takes down the pipeline.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use squall::alerts::{AlertDispatcher, LogPublisher};
//! use squall::detect::{DetectorRegistry, ThresholdDetector};
//! use squall::ingest::{EventPipeline, IngestOutcome};
//! use squall::preprocess::{ChannelMeta, Preprocessor, PreprocessorRegistry, WeatherPreprocessor};
//! use squall::storage::{MemoryAlertRepository, MemoryAuditRepository, MemoryThresholdRepository};
//! use squall::thresholds::ThresholdStore;
//!
//! let thresholds = Arc::new(ThresholdStore::new(Arc::new(MemoryThresholdRepository::new())));
//! thresholds.set("greenhouse", "temperature", None, Some(30.0));
//!
//! let pipeline = EventPipeline::new(
//!     Arc::new(MemoryAuditRepository::new()),
//!     PreprocessorRegistry::new(vec![(
//!         Arc::new(WeatherPreprocessor::new()) as Arc<dyn Preprocessor>,
//!         vec!["*".to_string()],
//!     )])
//!     .unwrap(),
//!     DetectorRegistry::new(vec![Arc::new(ThresholdDetector::new(Arc::clone(&thresholds)))]),
//!     AlertDispatcher::new(Arc::new(MemoryAlertRepository::new()), Arc::new(LogPublisher::new())),
//! );
//!
//! let outcome = pipeline.handle(
//!     br#"{"module": "greenhouse", "temperature": 35.0}"#,
//!     &ChannelMeta::default(),
//! );
//! assert_eq!(outcome, IngestOutcome::Processed { alerts: 1 });
//! ```

pub mod alerts;
pub mod api;
pub mod detect;
pub mod ingest;
pub mod preprocess;
pub mod storage;
pub mod thresholds;

#[cfg(feature = "kafka")]
pub mod seed;

// Re-export commonly used types
pub use alerts::{Alert, AlertDispatcher};
pub use detect::{Detector, DetectorRegistry};
pub use ingest::{EventPipeline, IngestOutcome};
pub use preprocess::{CanonicalEvent, ChannelMeta, Preprocessor, PreprocessorRegistry};
pub use thresholds::{ThresholdRange, ThresholdStore};
