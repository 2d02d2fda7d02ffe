//! Persist-then-publish alert dispatch

use std::sync::Arc;

use super::{Alert, AlertPublisher};
use crate::storage::AlertRepository;

/// Persists then publishes each alert independently.
///
/// An alert that fails to persist is not published; a publish failure
/// leaves the alert durably recorded. One alert's failure never aborts the
/// rest of the batch.
pub struct AlertDispatcher {
    repository: Arc<dyn AlertRepository>,
    publisher: Arc<dyn AlertPublisher>,
}

impl AlertDispatcher {
    pub fn new(repository: Arc<dyn AlertRepository>, publisher: Arc<dyn AlertPublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub fn dispatch_all(&self, alerts: &[Alert]) {
        if alerts.is_empty() {
            return;
        }

        for alert in alerts {
            if let Err(e) = self.repository.save(alert) {
                tracing::error!(
                    module = %alert.module,
                    metric = %alert.metric,
                    error = %e,
                    "Failed to persist alert"
                );
                continue;
            }
            tracing::info!(
                alert_id = %alert.id,
                module = %alert.module,
                metric = %alert.metric,
                value = alert.value,
                "Persisted alert"
            );

            match self.publisher.publish(alert) {
                Ok(()) => tracing::debug!(alert_id = %alert.id, "Published alert"),
                Err(e) => {
                    tracing::error!(alert_id = %alert.id, error = %e, "Failed to publish alert")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::PublishError;
    use crate::storage::{MemoryAlertRepository, StorageError};
    use parking_lot::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<Uuid>>,
    }

    impl AlertPublisher for RecordingPublisher {
        fn publish(&self, alert: &Alert) -> Result<(), PublishError> {
            self.published.lock().push(alert.id);
            Ok(())
        }
    }

    struct FailingPublisher;

    impl AlertPublisher for FailingPublisher {
        fn publish(&self, _alert: &Alert) -> Result<(), PublishError> {
            Err(PublishError::Broker("connection refused".to_string()))
        }
    }

    struct FailingRepository;

    impl AlertRepository for FailingRepository {
        fn save(&self, _alert: &Alert) -> Result<(), StorageError> {
            Err(StorageError::Backend("database unavailable".to_string()))
        }

        fn recent(&self, _limit: usize) -> Result<Vec<Alert>, StorageError> {
            Ok(Vec::new())
        }
    }

    fn alert(description: &str) -> Alert {
        Alert::new("m", "temperature", 20.0, None, Some(10.0), description)
    }

    #[test]
    fn test_persists_then_publishes() {
        let repository = Arc::new(MemoryAlertRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let dispatcher = AlertDispatcher::new(
            Arc::clone(&repository) as Arc<dyn AlertRepository>,
            Arc::clone(&publisher) as Arc<dyn AlertPublisher>,
        );

        let alerts = vec![alert("a"), alert("b")];
        dispatcher.dispatch_all(&alerts);

        assert_eq!(repository.all().len(), 2);
        assert_eq!(publisher.published.lock().len(), 2);
    }

    #[test]
    fn test_persistence_failure_skips_publish() {
        let publisher = Arc::new(RecordingPublisher::default());
        let dispatcher = AlertDispatcher::new(
            Arc::new(FailingRepository),
            Arc::clone(&publisher) as Arc<dyn AlertPublisher>,
        );

        dispatcher.dispatch_all(&[alert("a"), alert("b")]);

        // no alert was persisted, so none may be published
        assert!(publisher.published.lock().is_empty());
    }

    #[test]
    fn test_publish_failure_keeps_alert_persisted() {
        let repository = Arc::new(MemoryAlertRepository::new());
        let dispatcher = AlertDispatcher::new(
            Arc::clone(&repository) as Arc<dyn AlertRepository>,
            Arc::new(FailingPublisher),
        );

        dispatcher.dispatch_all(&[alert("a"), alert("b")]);

        assert_eq!(repository.all().len(), 2);
    }

    #[test]
    fn test_empty_batch_is_a_noop() {
        let repository = Arc::new(MemoryAlertRepository::new());
        let dispatcher = AlertDispatcher::new(
            Arc::clone(&repository) as Arc<dyn AlertRepository>,
            Arc::new(RecordingPublisher::default()),
        );
        dispatcher.dispatch_all(&[]);
        assert!(repository.all().is_empty());
    }
}
