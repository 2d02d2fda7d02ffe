//! Channel-aware preprocessing of raw broker messages
//!
//! Every inbound message arrives as a raw payload plus channel metadata
//! (routing key and consumer queue). A preprocessor turns that pair into a
//! [`CanonicalEvent`]; the registry picks the preprocessor for the channel
//! the message arrived on, falling back to the wildcard registration.

pub mod event;
pub mod registry;
pub mod weather;

pub use event::{CanonicalEvent, ChannelMeta};
pub use registry::{PreprocessorRegistry, RegistryError};
pub use weather::WeatherPreprocessor;

/// Errors raised while canonicalizing a raw payload
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// The raw payload could not be parsed as structured data
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// A preprocessing strategy: parses a raw payload plus channel metadata
/// into a [`CanonicalEvent`]. Pure transformation, no side effects.
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, raw: &str, meta: &ChannelMeta) -> Result<CanonicalEvent, PreprocessError>;
}
