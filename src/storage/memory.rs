//! In-memory repositories
//!
//! Used by tests and by runs without a configured data directory. State is
//! lost on restart.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    AlertRepository, AuditRepository, RawEventRecord, StorageError, ThresholdRepository,
};
use crate::alerts::Alert;
use crate::thresholds::ThresholdEntry;

#[derive(Default)]
pub struct MemoryThresholdRepository {
    entries: RwLock<HashMap<(String, String), ThresholdEntry>>,
}

impl MemoryThresholdRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThresholdRepository for MemoryThresholdRepository {
    fn find_all(&self) -> Result<Vec<ThresholdEntry>, StorageError> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn upsert(&self, entry: &ThresholdEntry) -> Result<(), StorageError> {
        self.entries.write().insert(
            (entry.module.clone(), entry.metric.clone()),
            entry.clone(),
        );
        Ok(())
    }

    fn delete(&self, module: &str, metric: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .remove(&(module.to_string(), metric.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAlertRepository {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All persisted alerts in insertion order
    pub fn all(&self) -> Vec<Alert> {
        self.alerts.read().clone()
    }
}

impl AlertRepository for MemoryAlertRepository {
    fn save(&self, alert: &Alert) -> Result<(), StorageError> {
        self.alerts.write().push(alert.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Alert>, StorageError> {
        let alerts = self.alerts.read();
        Ok(alerts.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryAuditRepository {
    records: RwLock<Vec<RawEventRecord>>,
}

impl MemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a single record by id
    pub fn get(&self, id: Uuid) -> Option<RawEventRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }
}

impl AuditRepository for MemoryAuditRepository {
    fn record(&self, payload: &str) -> Result<Uuid, StorageError> {
        let record = RawEventRecord::new(payload);
        let id = record.id;
        self.records.write().push(record);
        Ok(id)
    }

    fn classify(&self, id: Uuid, classification: &serde_json::Value) -> Result<(), StorageError> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StorageError::Backend(format!("audit record {} not found", id)))?;
        record.classification = Some(classification.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<RawEventRecord>, StorageError> {
        let records = self.records.read();
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_upsert_replaces() {
        let repo = MemoryThresholdRepository::new();
        repo.upsert(&ThresholdEntry {
            module: "m".to_string(),
            metric: "temperature".to_string(),
            min: Some(0.0),
            max: Some(10.0),
        })
        .unwrap();
        repo.upsert(&ThresholdEntry {
            module: "m".to_string(),
            metric: "temperature".to_string(),
            min: None,
            max: Some(25.0),
        })
        .unwrap();

        let all = repo.find_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].max, Some(25.0));
        assert_eq!(all[0].min, None);
    }

    #[test]
    fn test_audit_record_and_classify() {
        let repo = MemoryAuditRepository::new();
        let id = repo.record(r#"{"temperature": 99}"#).unwrap();

        repo.classify(id, &serde_json::json!({"eventType": "weather"}))
            .unwrap();

        let record = repo.get(id).unwrap();
        assert_eq!(record.payload, r#"{"temperature": 99}"#);
        assert_eq!(
            record.classification,
            Some(serde_json::json!({"eventType": "weather"}))
        );
    }

    #[test]
    fn test_classify_unknown_id_errors() {
        let repo = MemoryAuditRepository::new();
        let result = repo.classify(Uuid::new_v4(), &serde_json::json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn test_recent_is_newest_first() {
        let repo = MemoryAuditRepository::new();
        repo.record("first").unwrap();
        repo.record("second").unwrap();
        repo.record("third").unwrap();

        let recent = repo.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].payload, "third");
        assert_eq!(recent[1].payload, "second");
    }
}
