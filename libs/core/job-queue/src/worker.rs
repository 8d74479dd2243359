//! The worker loop: reserve, dispatch, report.
//!
//! A `Worker` runs as a long-lived task, pulling one job at a time from the
//! queue and invoking the handler registered for the job's type key. Handler
//! failures never stop the loop: transient failures are re-enqueued with
//! backoff up to the retry limit, everything else goes to the dead-letter
//! list.

use crate::config::QueueConfig;
use crate::error::JobError;
use crate::job::JobEnvelope;
use crate::queue::JobQueue;
use crate::registry::HandlerRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Queue worker. Spawn [`Worker::run`] as a task; it exits only when the
/// shutdown signal flips, after finishing any in-flight handler invocation.
pub struct Worker {
    queue: JobQueue,
    registry: Arc<HandlerRegistry>,
    config: QueueConfig,
}

impl Worker {
    /// Create a new worker over a queue and a handler registry.
    pub fn new(queue: JobQueue, registry: Arc<HandlerRegistry>, config: QueueConfig) -> Self {
        Self {
            queue,
            registry,
            config,
        }
    }

    /// Run the worker loop until the shutdown signal flips to `true`.
    ///
    /// The loop suspends on an empty queue; it never exits on its own.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            worker_id = %self.config.worker_id,
            job_types = ?self.registry.job_types(),
            "Starting queue worker"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let envelope = tokio::select! {
                envelope = self.queue.reserve() => envelope,
                _ = shutdown.changed() => continue,
            };

            self.process(envelope).await;
        }

        info!(worker_id = %self.config.worker_id, "Queue worker stopped");
    }

    /// Process one reserved job end to end.
    async fn process(&self, envelope: JobEnvelope) {
        let Some(handler) = self.registry.get(&envelope.job_type) else {
            // Configuration error for this job only; the loop moves on.
            let err = JobError::UnregisteredJobType(envelope.job_type.clone());
            error!(
                job_id = %envelope.id,
                job_type = %envelope.job_type,
                "No handler registered for job type, dead-lettering"
            );
            self.queue.bury(envelope, err.to_string()).await;
            return;
        };

        let started = std::time::Instant::now();
        let handler_timeout = Duration::from_millis(self.config.handler_timeout_ms);

        let result = match timeout(handler_timeout, handler.handle(&envelope.payload)).await {
            Ok(result) => result,
            Err(_) => Err(JobError::Timeout(self.config.handler_timeout_ms)),
        };

        match result {
            Ok(()) => {
                info!(
                    job_id = %envelope.id,
                    job_type = %envelope.job_type,
                    handler = handler.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job processed"
                );
            }
            Err(err) if err.should_retry(envelope.retry_count, self.config.max_retries) => {
                let delay = self.config.retry_backoff(envelope.retry_count);
                warn!(
                    job_id = %envelope.id,
                    job_type = %envelope.job_type,
                    handler = handler.name(),
                    error = %err,
                    retry_count = envelope.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Job handler failed, scheduling retry"
                );

                // Requeue after the backoff without stalling the loop.
                let queue = self.queue.clone();
                let retried = envelope.with_retry();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    queue.requeue(retried).await;
                });
            }
            Err(err) => {
                error!(
                    job_id = %envelope.id,
                    job_type = %envelope.job_type,
                    handler = handler.name(),
                    error = %err,
                    retry_count = envelope.retry_count,
                    "Job failed permanently, dead-lettering"
                );
                self.queue.bury(envelope, err.to_string()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use crate::registry::JobHandler;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct MailJob {
        to: String,
    }

    impl Job for MailJob {
        const JOB_TYPE: &'static str = "mail";
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct ReportJob {
        name: String,
    }

    impl Job for ReportJob {
        const JOB_TYPE: &'static str = "report";
    }

    struct CountingHandler {
        calls: Arc<AtomicU32>,
        result: fn() -> Result<(), JobError>,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, _payload: &serde_json::Value) -> Result<(), JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }

        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    fn spawn_worker(queue: &JobQueue, registry: HandlerRegistry, config: QueueConfig) -> watch::Sender<bool> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Worker::new(queue.clone(), Arc::new(registry), config);
        tokio::spawn(async move { worker.run(shutdown_rx).await });
        shutdown_tx
    }

    async fn wait_until(mut condition: impl AsyncFnMut() -> bool) {
        for _ in 0..200 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn test_worker_processes_enqueued_job() {
        let queue = JobQueue::new();
        let calls = Arc::new(AtomicU32::new(0));

        let mut registry = HandlerRegistry::new();
        registry
            .register_job::<MailJob>(Arc::new(CountingHandler {
                calls: calls.clone(),
                result: || Ok(()),
            }))
            .unwrap();

        let shutdown = spawn_worker(&queue, registry, QueueConfig::new());
        queue.enqueue(&MailJob { to: "a@b.c".into() }).await.unwrap();

        let calls_probe = calls.clone();
        wait_until(async || calls_probe.load(Ordering::SeqCst) == 1).await;
        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_failing_job_type_does_not_block_other_types() {
        let queue = JobQueue::new();
        let mail_calls = Arc::new(AtomicU32::new(0));
        let report_calls = Arc::new(AtomicU32::new(0));

        let mut registry = HandlerRegistry::new();
        registry
            .register_job::<MailJob>(Arc::new(CountingHandler {
                calls: mail_calls.clone(),
                result: || Err(JobError::permanent("smtp rejected the message")),
            }))
            .unwrap();
        registry
            .register_job::<ReportJob>(Arc::new(CountingHandler {
                calls: report_calls.clone(),
                result: || Ok(()),
            }))
            .unwrap();

        let shutdown = spawn_worker(&queue, registry, QueueConfig::new());

        queue.enqueue(&MailJob { to: "x@y.z".into() }).await.unwrap();
        queue.enqueue(&ReportJob { name: "weekly".into() }).await.unwrap();

        let probe = report_calls.clone();
        wait_until(async || probe.load(Ordering::SeqCst) == 1).await;

        assert_eq!(mail_calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.dead_letters().await.len(), 1);
        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_dead_letters() {
        let queue = JobQueue::new();
        let calls = Arc::new(AtomicU32::new(0));

        let mut registry = HandlerRegistry::new();
        registry
            .register_job::<MailJob>(Arc::new(CountingHandler {
                calls: calls.clone(),
                result: || Err(JobError::transient("connection refused")),
            }))
            .unwrap();

        let config = QueueConfig::new()
            .with_max_retries(2)
            .with_retry_delay_ms(1, 4);
        let shutdown = spawn_worker(&queue, registry, config);

        queue.enqueue(&MailJob { to: "x@y.z".into() }).await.unwrap();

        let queue_probe = queue.clone();
        wait_until(async || queue_probe.dead_letters().await.len() == 1).await;

        // Initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let dead = queue.dead_letters().await;
        assert_eq!(dead[0].envelope.retry_count, 2);
        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_unregistered_job_type_is_dead_lettered_and_loop_continues() {
        let queue = JobQueue::new();
        let calls = Arc::new(AtomicU32::new(0));

        let mut registry = HandlerRegistry::new();
        registry
            .register_job::<MailJob>(Arc::new(CountingHandler {
                calls: calls.clone(),
                result: || Ok(()),
            }))
            .unwrap();

        let shutdown = spawn_worker(&queue, registry, QueueConfig::new());

        queue
            .enqueue_raw("nobody_handles_this", serde_json::json!({}))
            .await;
        queue.enqueue(&MailJob { to: "a@b.c".into() }).await.unwrap();

        let probe = calls.clone();
        wait_until(async || probe.load(Ordering::SeqCst) == 1).await;

        let dead = queue.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].envelope.job_type, "nobody_handles_this");
        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_handler_timeout_is_bounded() {
        struct SlowHandler;

        #[async_trait]
        impl JobHandler for SlowHandler {
            async fn handle(&self, _payload: &serde_json::Value) -> Result<(), JobError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }

            fn name(&self) -> &'static str {
                "SlowHandler"
            }
        }

        let queue = JobQueue::new();
        let mut registry = HandlerRegistry::new();
        registry.register_job::<MailJob>(Arc::new(SlowHandler)).unwrap();

        let config = QueueConfig::new()
            .with_handler_timeout_ms(20)
            .with_max_retries(0);
        let shutdown = spawn_worker(&queue, registry, config);

        queue.enqueue(&MailJob { to: "a@b.c".into() }).await.unwrap();

        let queue_probe = queue.clone();
        wait_until(async || queue_probe.dead_letters().await.len() == 1).await;
        assert!(queue.dead_letters().await[0].error.contains("timed out"));
        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_graceful_shutdown_stops_idle_worker() {
        let queue = JobQueue::new();
        let registry = HandlerRegistry::new();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Worker::new(queue.clone(), Arc::new(registry), QueueConfig::new());
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should exit after shutdown signal")
            .unwrap();
    }
}
