//! Persistence collaborators for thresholds, alerts, and raw-event audit
//!
//! The pipeline talks to storage through the repository traits below.
//! In-memory implementations back tests and brokerless runs; file-backed
//! implementations persist across restarts.

pub mod file;
pub mod memory;

pub use file::{FileAlertRepository, FileAuditRepository, FileThresholdRepository};
pub use memory::{MemoryAlertRepository, MemoryAuditRepository, MemoryThresholdRepository};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::Alert;
use crate::thresholds::ThresholdEntry;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}

/// Audit record of a raw inbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventRecord {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    /// Original payload, stored verbatim
    pub payload: String,
    /// Canonicalization metadata, or a failure marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<serde_json::Value>,
}

impl RawEventRecord {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            payload: payload.into(),
            classification: None,
        }
    }
}

/// Source of truth for configured thresholds
pub trait ThresholdRepository: Send + Sync {
    fn find_all(&self) -> Result<Vec<ThresholdEntry>, StorageError>;

    /// Create or update the entry for `(entry.module, entry.metric)`
    fn upsert(&self, entry: &ThresholdEntry) -> Result<(), StorageError>;

    fn delete(&self, module: &str, metric: &str) -> Result<(), StorageError>;
}

/// Durable record of emitted alerts
pub trait AlertRepository: Send + Sync {
    fn save(&self, alert: &Alert) -> Result<(), StorageError>;

    /// Most recent alerts, newest first
    fn recent(&self, limit: usize) -> Result<Vec<Alert>, StorageError>;
}

/// Verbatim archive of raw inbound messages
pub trait AuditRepository: Send + Sync {
    /// Persist a raw payload verbatim, returning the new record id
    fn record(&self, payload: &str) -> Result<Uuid, StorageError>;

    /// Attach classification metadata to an existing record
    fn classify(&self, id: Uuid, classification: &serde_json::Value) -> Result<(), StorageError>;

    /// Most recent records, newest first
    fn recent(&self, limit: usize) -> Result<Vec<RawEventRecord>, StorageError>;
}
