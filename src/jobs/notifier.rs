/// Job event notification
///
/// The job store pushes a `JobEvent` after every status write. Delivery is
/// best-effort: a failing notifier is logged and never affects the job record.

use crate::jobs::types::JobEvent;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Push interface for job status listeners
#[async_trait]
pub trait JobNotifier: Send + Sync {
    async fn notify(&self, event: JobEvent) -> Result<()>;
}

/// In-process notifier fanning events out to broadcast subscribers
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<JobEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl JobNotifier for BroadcastNotifier {
    async fn notify(&self, event: JobEvent) -> Result<()> {
        // No subscribers is not a failure, events are simply dropped
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobStatus;

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut receiver = notifier.subscribe();

        let event = JobEvent {
            job_id: "job-1".to_string(),
            status: JobStatus::Processing,
            timestamp: chrono::Utc::now(),
        };
        notifier.notify(event.clone()).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_ok() {
        let notifier = BroadcastNotifier::new(1);
        let event = JobEvent {
            job_id: "job-1".to_string(),
            status: JobStatus::Pending,
            timestamp: chrono::Utc::now(),
        };
        assert!(notifier.notify(event).await.is_ok());
    }
}
