//! File-backed repositories
//!
//! Thresholds live in a single JSON document rewritten atomically on each
//! mutation (write to a temp file, then rename). Alerts and audit records
//! are append-only JSONL; audit classification updates are appended as
//! patch lines and replayed on read.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AlertRepository, AuditRepository, RawEventRecord, StorageError, ThresholdRepository,
};
use crate::alerts::Alert;
use crate::thresholds::ThresholdEntry;

fn read_or_empty(path: &Path) -> Result<String, StorageError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn append_line(path: &Path, line: &str) -> Result<(), StorageError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Thresholds as a JSON array, rewritten in full on every mutation
pub struct FileThresholdRepository {
    path: PathBuf,
    // serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FileThresholdRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> Result<Vec<ThresholdEntry>, StorageError> {
        let text = read_or_empty(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn write_entries(&self, entries: &[ThresholdEntry]) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ThresholdRepository for FileThresholdRepository {
    fn find_all(&self) -> Result<Vec<ThresholdEntry>, StorageError> {
        let _guard = self.lock.lock();
        self.read_entries()
    }

    fn upsert(&self, entry: &ThresholdEntry) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        match entries
            .iter_mut()
            .find(|e| e.module == entry.module && e.metric == entry.metric)
        {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        self.write_entries(&entries)
    }

    fn delete(&self, module: &str, metric: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        entries.retain(|e| e.module != module || e.metric != metric);
        self.write_entries(&entries)
    }
}

/// Alerts as append-only JSONL
pub struct FileAlertRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileAlertRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl AlertRepository for FileAlertRepository {
    fn save(&self, alert: &Alert) -> Result<(), StorageError> {
        let line = serde_json::to_string(alert)?;
        let _guard = self.lock.lock();
        append_line(&self.path, &line)
    }

    fn recent(&self, limit: usize) -> Result<Vec<Alert>, StorageError> {
        let _guard = self.lock.lock();
        let text = read_or_empty(&self.path)?;
        let alerts: Vec<Alert> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect();
        Ok(alerts.into_iter().rev().take(limit).collect())
    }
}

#[derive(Serialize, Deserialize)]
struct ClassificationPatch {
    id: Uuid,
    classification: serde_json::Value,
}

/// Raw-event audit log as append-only JSONL with classification patch lines
pub struct FileAuditRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileAuditRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    // Records parse before patches: a patch line has no `payload` field and
    // fails RawEventRecord deserialization.
    fn replay(&self) -> Result<Vec<RawEventRecord>, StorageError> {
        let text = read_or_empty(&self.path)?;
        let mut order: Vec<Uuid> = Vec::new();
        let mut records: HashMap<Uuid, RawEventRecord> = HashMap::new();

        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if let Ok(record) = serde_json::from_str::<RawEventRecord>(line) {
                if !records.contains_key(&record.id) {
                    order.push(record.id);
                }
                records.insert(record.id, record);
            } else if let Ok(patch) = serde_json::from_str::<ClassificationPatch>(line) {
                if let Some(record) = records.get_mut(&patch.id) {
                    record.classification = Some(patch.classification);
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| records.remove(&id))
            .collect())
    }
}

impl AuditRepository for FileAuditRepository {
    fn record(&self, payload: &str) -> Result<Uuid, StorageError> {
        let record = RawEventRecord::new(payload);
        let line = serde_json::to_string(&record)?;
        let _guard = self.lock.lock();
        append_line(&self.path, &line)?;
        Ok(record.id)
    }

    fn classify(&self, id: Uuid, classification: &serde_json::Value) -> Result<(), StorageError> {
        let patch = ClassificationPatch {
            id,
            classification: classification.clone(),
        };
        let line = serde_json::to_string(&patch)?;
        let _guard = self.lock.lock();
        append_line(&self.path, &line)
    }

    fn recent(&self, limit: usize) -> Result<Vec<RawEventRecord>, StorageError> {
        let _guard = self.lock.lock();
        let records = self.replay()?;
        Ok(records.into_iter().rev().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thresholds.json");

        let repo = FileThresholdRepository::new(&path);
        repo.upsert(&ThresholdEntry {
            module: "green-medium".to_string(),
            metric: "temperature".to_string(),
            min: Some(5.0),
            max: Some(30.0),
        })
        .unwrap();
        repo.upsert(&ThresholdEntry {
            module: "green-medium".to_string(),
            metric: "humidity".to_string(),
            min: None,
            max: Some(80.0),
        })
        .unwrap();

        let reopened = FileThresholdRepository::new(&path);
        let mut all = reopened.find_all().unwrap();
        all.sort_by(|a, b| a.metric.cmp(&b.metric));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].metric, "humidity");
        assert_eq!(all[1].min, Some(5.0));
    }

    #[test]
    fn test_threshold_delete() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileThresholdRepository::new(dir.path().join("thresholds.json"));

        repo.upsert(&ThresholdEntry {
            module: "m".to_string(),
            metric: "pressure".to_string(),
            min: Some(700.0),
            max: None,
        })
        .unwrap();
        repo.delete("m", "pressure").unwrap();

        assert!(repo.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_alerts_append_and_recent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileAlertRepository::new(dir.path().join("alerts.jsonl"));

        for i in 0..3 {
            let alert = Alert::new(
                "m",
                "temperature",
                20.0 + i as f64,
                None,
                Some(10.0),
                format!("alert {}", i),
            );
            repo.save(&alert).unwrap();
        }

        let recent = repo.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].description, "alert 2");
        assert_eq!(recent[1].description, "alert 1");
    }

    #[test]
    fn test_audit_classification_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let repo = FileAuditRepository::new(&path);
        let first = repo.record(r#"{"temperature": 50}"#).unwrap();
        let second = repo.record("garbage").unwrap();
        repo.classify(first, &serde_json::json!({"eventType": "weather"}))
            .unwrap();
        repo.classify(
            second,
            &serde_json::json!({"status": "canonicalization_failed"}),
        )
        .unwrap();

        let reopened = FileAuditRepository::new(&path);
        let recent = reopened.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        // newest first
        assert_eq!(recent[0].payload, "garbage");
        assert_eq!(
            recent[0].classification,
            Some(serde_json::json!({"status": "canonicalization_failed"}))
        );
        assert_eq!(
            recent[1].classification,
            Some(serde_json::json!({"eventType": "weather"}))
        );
    }
}
