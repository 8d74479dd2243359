//! The job queue: the single point of coordination between producers and
//! consumers.
//!
//! Producers call [`JobQueue::enqueue`] from the request path and return
//! immediately; consumers call [`JobQueue::reserve`], which suspends until a
//! job is available and removes exactly one. Removal happens under the queue
//! lock, so no two concurrent reservers can receive the same job.

use crate::error::JobError;
use crate::job::{Job, JobEnvelope};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

/// A job that exhausted its retries (or had no handler) and was set aside.
#[derive(Debug, Clone)]
pub struct DeadJob {
    /// The envelope as it was when the job failed for the last time.
    pub envelope: JobEnvelope,
    /// The last failure message.
    pub error: String,
    /// When the job was dead-lettered.
    pub failed_at: DateTime<Utc>,
}

struct Inner {
    jobs: Mutex<VecDeque<JobEnvelope>>,
    dead: Mutex<Vec<DeadJob>>,
    notify: Notify,
}

/// In-process job queue shared between producers and consumers.
///
/// Cloning is cheap and yields a handle to the same queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(VecDeque::new()),
                dead: Mutex::new(Vec::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Enqueue a typed job. Returns the job ID.
    ///
    /// Fire-and-forget from the producer's perspective: the call returns as
    /// soon as the job is on the queue and never waits for processing.
    pub async fn enqueue<J: Job>(&self, job: &J) -> Result<Uuid, JobError> {
        let envelope = JobEnvelope::from_job(job)?;
        Ok(self.push(envelope).await)
    }

    /// Enqueue a raw payload under an arbitrary type key.
    pub async fn enqueue_raw(
        &self,
        job_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Uuid {
        self.push(JobEnvelope::new(job_type, payload)).await
    }

    /// Put a previously reserved job back on the queue for another attempt.
    pub(crate) async fn requeue(&self, envelope: JobEnvelope) {
        debug!(
            job_id = %envelope.id,
            job_type = %envelope.job_type,
            retry_count = envelope.retry_count,
            "Requeued job"
        );
        self.push(envelope).await;
    }

    async fn push(&self, envelope: JobEnvelope) -> Uuid {
        let id = envelope.id;
        debug!(job_id = %id, job_type = %envelope.job_type, "Enqueued job");

        self.inner.jobs.lock().await.push_back(envelope);
        self.inner.notify.notify_one();
        id
    }

    /// Remove and return one job, suspending until one is available.
    ///
    /// This is the atomic reservation point: the pop happens while the queue
    /// lock is held, so each job is handed to exactly one caller.
    pub async fn reserve(&self) -> JobEnvelope {
        loop {
            {
                let mut jobs = self.inner.jobs.lock().await;
                if let Some(envelope) = jobs.pop_front() {
                    // A single notify permit can cover several queued jobs;
                    // wake a sibling if there is more work.
                    if !jobs.is_empty() {
                        self.inner.notify.notify_one();
                    }
                    return envelope;
                }
            }
            self.inner.notify.notified().await;
        }
    }

    /// Remove and return one job if available, without waiting.
    pub async fn try_reserve(&self) -> Option<JobEnvelope> {
        self.inner.jobs.lock().await.pop_front()
    }

    /// Move a job to the dead-letter list.
    pub async fn bury(&self, envelope: JobEnvelope, error: impl Into<String>) {
        let dead = DeadJob {
            envelope,
            error: error.into(),
            failed_at: Utc::now(),
        };
        self.inner.dead.lock().await.push(dead);
    }

    /// Snapshot of the dead-letter list.
    pub async fn dead_letters(&self) -> Vec<DeadJob> {
        self.inner.dead.lock().await.clone()
    }

    /// Number of pending jobs.
    pub async fn len(&self) -> usize {
        self.inner.jobs.lock().await.len()
    }

    /// Whether the queue has no pending jobs.
    pub async fn is_empty(&self) -> bool {
        self.inner.jobs.lock().await.is_empty()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestJob {
        value: u32,
    }

    impl Job for TestJob {
        const JOB_TYPE: &'static str = "test";
    }

    #[tokio::test]
    async fn test_enqueue_reserve_round_trip() {
        let queue = JobQueue::new();
        let id = queue.enqueue(&TestJob { value: 42 }).await.unwrap();

        let envelope = queue.reserve().await;
        assert_eq!(envelope.id, id);
        assert_eq!(envelope.job_type, "test");
        assert_eq!(envelope.decode::<TestJob>().unwrap(), TestJob { value: 42 });
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = JobQueue::new();
        for value in 0..3 {
            queue.enqueue(&TestJob { value }).await.unwrap();
        }

        for value in 0..3 {
            let envelope = queue.reserve().await;
            assert_eq!(envelope.decode::<TestJob>().unwrap().value, value);
        }
    }

    #[tokio::test]
    async fn test_reserve_blocks_until_enqueue() {
        let queue = JobQueue::new();

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.reserve().await })
        };

        // Give the consumer time to park on the empty queue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.enqueue(&TestJob { value: 7 }).await.unwrap();
        let envelope = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("reserve should wake after enqueue")
            .unwrap();
        assert_eq!(envelope.decode::<TestJob>().unwrap().value, 7);
    }

    #[tokio::test]
    async fn test_no_duplicate_delivery_to_concurrent_reservers() {
        let queue = JobQueue::new();

        let a = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.reserve().await })
        };
        let b = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.reserve().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(&TestJob { value: 1 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Exactly one reserver got the job; the other is still waiting.
        assert_eq!(
            u32::from(a.is_finished()) + u32::from(b.is_finished()),
            1,
            "one enqueue must satisfy exactly one reserver"
        );

        // Release the remaining reserver so the test can finish cleanly.
        queue.enqueue(&TestJob { value: 2 }).await.unwrap();
        let (first, second) = (a.await.unwrap(), b.await.unwrap());
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_concurrent_reservers_drain_without_duplicates() {
        let queue = JobQueue::new();
        for value in 0..100 {
            queue.enqueue(&TestJob { value }).await.unwrap();
        }

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            consumers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(envelope) = queue.try_reserve().await {
                    seen.push(envelope.id);
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 100, "every job delivered exactly once");
    }

    #[tokio::test]
    async fn test_bury_and_dead_letters() {
        let queue = JobQueue::new();
        queue.enqueue(&TestJob { value: 9 }).await.unwrap();

        let envelope = queue.reserve().await;
        queue.bury(envelope, "handler exploded").await;

        let dead = queue.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].error, "handler exploded");
        assert_eq!(dead[0].envelope.job_type, "test");
    }
}
