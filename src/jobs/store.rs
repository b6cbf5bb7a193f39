/// In-memory job store
///
/// Owns every `Job` record for the lifetime of the process. The map is the only
/// shared mutable state of the dispatch core; all writes go through
/// `create_job` and `update_status`, each performed under a single write lock so
/// interleaved writers can never reorder a job's `updated_at`. The notifier is
/// called under the same lock, so listeners observe events in write order;
/// notifiers must return promptly and must not call back into the store.

use crate::jobs::notifier::JobNotifier;
use crate::jobs::types::{Job, JobEvent, JobStatus};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Thread-safe job table with monotonic timestamps
pub struct JobStore {
    /// Key: job id, Value: current job record
    jobs: RwLock<HashMap<String, Job>>,
    /// Optional listener for status transitions
    notifier: Option<Arc<dyn JobNotifier>>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStore")
            .field("has_notifier", &self.notifier.is_some())
            .finish()
    }
}

/// Current time truncated to whole milliseconds, the store's timestamp unit
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Next `updated_at` for a record last touched at `previous`
///
/// Advances by at least one millisecond when the clock has not moved (or went
/// backwards).
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_millis();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            notifier: None,
        }
    }

    pub fn with_notifier(notifier: Arc<dyn JobNotifier>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            notifier: Some(notifier),
        }
    }

    /// Create a Pending job for `input` and return its id
    pub async fn create_job(&self, input: Value) -> String {
        let now = now_millis();
        let job = {
            let mut jobs = self.jobs.write().await;
            let mut id = uuid::Uuid::new_v4().to_string();
            // v4 collisions are not expected, but never overwrite a live record
            while jobs.contains_key(&id) {
                id = uuid::Uuid::new_v4().to_string();
            }

            let job = Job {
                id: id.clone(),
                status: JobStatus::Pending,
                input,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            };
            jobs.insert(id, job.clone());
            self.notify(&job).await;
            job
        };

        tracing::info!("📝 Created job: {}", job.id);
        job.id
    }

    /// Move a job to `status`
    ///
    /// Returns false when no job with `id` exists. Completed keeps only
    /// `result`, Failed keeps only `error`, Pending and Processing clear both.
    /// Transitions are not guarded; leaving a terminal state is logged.
    pub async fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        result: Option<String>,
        error: Option<String>,
    ) -> bool {
        let updated = {
            let mut jobs = self.jobs.write().await;
            let Some(job) = jobs.get_mut(id) else {
                tracing::warn!("⚠️ Status update for unknown job: {} -> {}", id, status);
                return false;
            };

            if job.status.is_terminal() && job.status != status {
                tracing::warn!(
                    "⚠️ Job {} leaves terminal state {} for {}",
                    id,
                    job.status,
                    status
                );
            }

            job.status = status;
            job.updated_at = next_timestamp(job.updated_at);
            match status {
                JobStatus::Completed => {
                    job.result = result;
                    job.error = None;
                }
                JobStatus::Failed => {
                    job.result = None;
                    job.error = Some(error.unwrap_or_else(|| "Unknown error".to_string()));
                }
                JobStatus::Pending | JobStatus::Processing => {
                    job.result = None;
                    job.error = None;
                }
            }
            let updated = job.clone();
            self.notify(&updated).await;
            updated
        };

        tracing::debug!("🔄 Job {} is now {}", updated.id, updated.status);
        true
    }

    /// Snapshot of a single job
    pub async fn get_job(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Snapshot of all jobs, oldest first
    pub async fn list_jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn notify(&self, job: &Job) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(JobEvent::from_job(job)).await {
                tracing::warn!("⚠️ Job notifier failed for {}: {}", job.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::notifier::BroadcastNotifier;
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingNotifier;

    #[async_trait]
    impl JobNotifier for FailingNotifier {
        async fn notify(&self, _event: JobEvent) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("listener went away"))
        }
    }

    #[tokio::test]
    async fn test_create_job_starts_pending() {
        let store = JobStore::new();
        let id = store.create_job(json!({"topic": "billing"})).await;
        let job = store.get_job(&id).await.unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.result, None);
        assert_eq!(job.error, None);
        assert_eq!(job.input, json!({"topic": "billing"}));
        assert_eq!(job.created_at, job.updated_at);
    }

    #[tokio::test]
    async fn test_job_ids_are_unique() {
        let store = JobStore::new();
        let a = store.create_job(json!({})).await;
        let b = store.create_job(json!({})).await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_job_returns_false() {
        let store = JobStore::new();
        assert!(!store.update_status("nope", JobStatus::Completed, None, None).await);
        assert!(store.get_job("nope").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_updated_at_strictly_increases_within_same_tick() {
        let store = JobStore::new();
        let id = store.create_job(json!({})).await;
        let mut last = store.get_job(&id).await.unwrap().updated_at;

        for status in [
            JobStatus::Processing,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Pending,
        ] {
            assert!(store.update_status(&id, status, None, None).await);
            let current = store.get_job(&id).await.unwrap().updated_at;
            assert!(current > last, "{} should be after {}", current, last);
            last = current;
        }
    }

    #[tokio::test]
    async fn test_result_and_error_are_exclusive() {
        let store = JobStore::new();
        let id = store.create_job(json!({})).await;

        store
            .update_status(&id, JobStatus::Failed, Some("ignored".into()), Some("boom".into()))
            .await;
        let job = store.get_job(&id).await.unwrap();
        assert_eq!(job.result, None);
        assert_eq!(job.error.as_deref(), Some("boom"));

        store
            .update_status(&id, JobStatus::Completed, Some("done".into()), Some("ignored".into()))
            .await;
        let job = store.get_job(&id).await.unwrap();
        assert_eq!(job.result.as_deref(), Some("done"));
        assert_eq!(job.error, None);

        store.update_status(&id, JobStatus::Completed, None, None).await;
        assert_eq!(store.get_job(&id).await.unwrap().result, None);

        store.update_status(&id, JobStatus::Processing, Some("x".into()), None).await;
        let job = store.get_job(&id).await.unwrap();
        assert_eq!((job.result, job.error), (None, None));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_totally_ordered() {
        let store = Arc::new(JobStore::new());
        let id = store.create_job(json!({})).await;
        let created = store.get_job(&id).await.unwrap().created_at;

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.update_status(&id, JobStatus::Processing, None, None).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let job = store.get_job(&id).await.unwrap();
        assert!(job.updated_at >= created + Duration::milliseconds(32));
    }

    #[tokio::test]
    async fn test_notifier_sees_every_transition() {
        let notifier = Arc::new(BroadcastNotifier::new(16));
        let mut events = notifier.subscribe();
        let store = JobStore::with_notifier(notifier);

        let id = store.create_job(json!({})).await;
        store.update_status(&id, JobStatus::Processing, None, None).await;
        store.update_status(&id, JobStatus::Completed, Some("ok".into()), None).await;

        let statuses: Vec<_> = vec![
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
        ]
        .into_iter()
        .map(|event| {
            assert_eq!(event.job_id, id);
            event.status
        })
        .collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_events_arrive_in_update_order() {
        let notifier = Arc::new(BroadcastNotifier::new(128));
        let mut events = notifier.subscribe();
        let store = Arc::new(JobStore::with_notifier(notifier));
        let id = store.create_job(json!({})).await;

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            let id = id.clone();
            let status = if i % 2 == 0 { JobStatus::Processing } else { JobStatus::Pending };
            handles.push(tokio::spawn(async move { store.update_status(&id, status, None, None).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let mut previous = events.recv().await.unwrap().timestamp;
        for _ in 0..32 {
            let event = events.recv().await.unwrap();
            assert!(event.timestamp > previous);
            previous = event.timestamp;
        }
        assert_eq!(store.get_job(&id).await.unwrap().updated_at, previous);
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_block_update() {
        let store = JobStore::with_notifier(Arc::new(FailingNotifier));
        let id = store.create_job(json!({})).await;

        assert!(store.update_status(&id, JobStatus::Completed, Some("ok".into()), None).await);
        assert_eq!(store.get_job(&id).await.unwrap().status, JobStatus::Completed);
    }
}
