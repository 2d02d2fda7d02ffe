//! Maps channel identifiers to preprocessing strategies

use std::collections::HashMap;
use std::sync::Arc;

use super::Preprocessor;

/// Channel pattern that registers a preprocessor as the fallback
pub const WILDCARD_CHANNEL: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Starting with zero preprocessors is a configuration error
    #[error("no preprocessors registered")]
    Empty,
}

/// Registry of preprocessors keyed by channel.
///
/// Populated once at startup from an explicit list of registrations and
/// read-only afterwards. Exactly one preprocessor may register for the
/// wildcard channel `"*"`; when none does, the first registered
/// preprocessor becomes the fallback.
pub struct PreprocessorRegistry {
    by_channel: HashMap<String, Arc<dyn Preprocessor>>,
    fallback: Arc<dyn Preprocessor>,
}

impl PreprocessorRegistry {
    /// Build the registry from `(preprocessor, channels)` registrations.
    pub fn new(
        registrations: Vec<(Arc<dyn Preprocessor>, Vec<String>)>,
    ) -> Result<Self, RegistryError> {
        let mut by_channel: HashMap<String, Arc<dyn Preprocessor>> = HashMap::new();
        let mut wildcard: Option<Arc<dyn Preprocessor>> = None;
        let mut first: Option<Arc<dyn Preprocessor>> = None;

        for (preprocessor, channels) in registrations {
            if first.is_none() {
                first = Some(Arc::clone(&preprocessor));
            }
            for channel in channels {
                if channel == WILDCARD_CHANNEL {
                    wildcard = Some(Arc::clone(&preprocessor));
                } else {
                    by_channel.insert(channel, Arc::clone(&preprocessor));
                }
            }
        }

        let fallback = wildcard.or(first).ok_or(RegistryError::Empty)?;
        tracing::info!(
            "Preprocessor registry initialized with {} channel mappings",
            by_channel.len()
        );

        Ok(Self { by_channel, fallback })
    }

    /// The preprocessor registered for `channel`, else the fallback.
    pub fn resolve(&self, channel: &str) -> &Arc<dyn Preprocessor> {
        self.by_channel.get(channel).unwrap_or(&self.fallback)
    }
}
