//! Message ingest
//!
//! The per-message pipeline plus the sources that feed it:
//! - HTTP ingest endpoint (always available, see `api`)
//! - Kafka consumer (optional, enable with the `kafka` feature)

pub mod pipeline;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use pipeline::{EventPipeline, IngestOutcome};

#[cfg(feature = "kafka")]
pub use kafka::{ConsumerHandle, KafkaConfig, KafkaConsumer};
