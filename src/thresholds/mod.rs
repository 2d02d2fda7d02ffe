//! Threshold configuration store
//!
//! Concurrent cache of `(module, metric)` -> range, backed by a
//! [`ThresholdRepository`] for load-at-startup and explicit mutation. The
//! cache is the only state shared across ingest workers; readers see a set
//! value immediately even when the subsequent persistence write fails.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::storage::ThresholdRepository;

/// Configured `[min, max]` bounds for a module+metric pair.
///
/// Either bound may be absent; a range with both bounds unset is inert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Persisted/API form of a configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdEntry {
    pub module: String,
    pub metric: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Concurrent threshold cache with write-through persistence.
///
/// Keys are the literal `(module, metric)` pair; the store performs no
/// normalization and no `min <= max` validation. Persistence failures are
/// logged and the cache stays authoritative until the next restart.
pub struct ThresholdStore {
    cache: DashMap<(String, String), ThresholdRange>,
    repository: Arc<dyn ThresholdRepository>,
}

impl ThresholdStore {
    pub fn new(repository: Arc<dyn ThresholdRepository>) -> Self {
        Self {
            cache: DashMap::new(),
            repository,
        }
    }

    /// Bulk-populate the cache from the repository.
    ///
    /// Invoked once at startup, before the cache is exposed to workers. A
    /// persistence failure is logged and leaves the cache empty.
    pub fn load(&self) {
        match self.repository.find_all() {
            Ok(entries) => {
                let count = entries.len();
                for entry in entries {
                    self.cache.insert(
                        (entry.module, entry.metric),
                        ThresholdRange {
                            min: entry.min,
                            max: entry.max,
                        },
                    );
                }
                tracing::info!("Loaded {} thresholds", count);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load thresholds");
            }
        }
    }

    pub fn get(&self, module: &str, metric: &str) -> Option<ThresholdRange> {
        self.cache
            .get(&(module.to_string(), metric.to_string()))
            .map(|range| *range)
    }

    /// Update the cache entry, then persist. The cache is updated first so
    /// readers observe the new value even if persistence fails.
    pub fn set(&self, module: &str, metric: &str, min: Option<f64>, max: Option<f64>) {
        self.cache.insert(
            (module.to_string(), metric.to_string()),
            ThresholdRange { min, max },
        );

        let entry = ThresholdEntry {
            module: module.to_string(),
            metric: metric.to_string(),
            min,
            max,
        };
        if let Err(e) = self.repository.upsert(&entry) {
            tracing::error!(module, metric, error = %e, "Failed to persist threshold");
        }
    }

    /// Remove from the cache, then attempt the persistent delete.
    pub fn delete(&self, module: &str, metric: &str) {
        self.cache.remove(&(module.to_string(), metric.to_string()));
        if let Err(e) = self.repository.delete(module, metric) {
            tracing::error!(module, metric, error = %e, "Failed to delete threshold");
        }
    }

    /// Snapshot of every configured threshold
    pub fn list(&self) -> Vec<ThresholdEntry> {
        self.cache
            .iter()
            .map(|item| {
                let (module, metric) = item.key().clone();
                ThresholdEntry {
                    module,
                    metric,
                    min: item.min,
                    max: item.max,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryThresholdRepository, StorageError};

    struct FailingRepository;

    impl ThresholdRepository for FailingRepository {
        fn find_all(&self) -> Result<Vec<ThresholdEntry>, StorageError> {
            Err(StorageError::Backend("database unavailable".to_string()))
        }

        fn upsert(&self, _entry: &ThresholdEntry) -> Result<(), StorageError> {
            Err(StorageError::Backend("database unavailable".to_string()))
        }

        fn delete(&self, _module: &str, _metric: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend("database unavailable".to_string()))
        }
    }

    fn store() -> ThresholdStore {
        ThresholdStore::new(Arc::new(MemoryThresholdRepository::new()))
    }

    #[test]
    fn test_set_then_get_returns_exact_bounds() {
        let store = store();
        store.set("green-medium", "temperature", Some(5.0), Some(30.0));

        let range = store.get("green-medium", "temperature").unwrap();
        assert_eq!(range.min, Some(5.0));
        assert_eq!(range.max, Some(30.0));
    }

    #[test]
    fn test_delete_then_get_returns_absent() {
        let store = store();
        store.set("m", "humidity", Some(20.0), Some(60.0));
        store.delete("m", "humidity");
        assert!(store.get("m", "humidity").is_none());
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let store = store();
        store.set("Module", "temperature", None, Some(10.0));
        assert!(store.get("module", "temperature").is_none());
        assert!(store.get("Module", "temperature").is_some());
    }

    #[test]
    fn test_load_populates_cache_from_repository() {
        let repo = Arc::new(MemoryThresholdRepository::new());
        repo.upsert(&ThresholdEntry {
            module: "m".to_string(),
            metric: "pressure".to_string(),
            min: Some(700.0),
            max: Some(780.0),
        })
        .unwrap();

        let store = ThresholdStore::new(repo);
        assert!(store.get("m", "pressure").is_none());

        store.load();
        assert_eq!(
            store.get("m", "pressure"),
            Some(ThresholdRange {
                min: Some(700.0),
                max: Some(780.0)
            })
        );
    }

    #[test]
    fn test_load_failure_leaves_cache_empty() {
        let store = ThresholdStore::new(Arc::new(FailingRepository));
        store.load();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_cache_updated_even_when_persistence_fails() {
        let store = ThresholdStore::new(Arc::new(FailingRepository));
        store.set("m", "temperature", None, Some(10.0));

        // readers observe the write despite the failed persistence call
        assert_eq!(
            store.get("m", "temperature"),
            Some(ThresholdRange {
                min: None,
                max: Some(10.0)
            })
        );

        store.delete("m", "temperature");
        assert!(store.get("m", "temperature").is_none());
    }
}
