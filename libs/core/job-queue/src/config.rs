//! Worker configuration.

use std::time::Duration;
use uuid::Uuid;

/// Configuration for the queue worker.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Unique worker ID, used in log output.
    pub worker_id: String,

    /// Maximum retries for a transient job failure before dead-lettering.
    pub max_retries: u32,

    /// Per-job handler timeout in milliseconds.
    pub handler_timeout_ms: u64,

    /// Base delay in milliseconds before a failed job is re-enqueued.
    pub retry_base_delay_ms: u64,

    /// Cap on the retry delay in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl QueueConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::new_v4()),
            max_retries: 3,
            handler_timeout_ms: 30_000,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5_000,
        }
    }

    /// Set the worker ID.
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    /// Set the maximum retries before dead-lettering.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-job handler timeout.
    pub fn with_handler_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.handler_timeout_ms = timeout_ms;
        self
    }

    /// Set the retry backoff bounds.
    pub fn with_retry_delay_ms(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.retry_base_delay_ms = base_ms;
        self.retry_max_delay_ms = max_ms;
        self
    }

    /// Exponential backoff delay before the given retry attempt.
    pub fn retry_backoff(&self, retry_count: u32) -> Duration {
        let delay = self
            .retry_base_delay_ms
            .saturating_mul(2u64.saturating_pow(retry_count));
        Duration::from_millis(delay.min(self.retry_max_delay_ms))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::new();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.handler_timeout_ms, 30_000);
        assert!(config.worker_id.starts_with("worker-"));
    }

    #[test]
    fn test_builder() {
        let config = QueueConfig::new()
            .with_worker_id("worker-1")
            .with_max_retries(5)
            .with_handler_timeout_ms(1_000)
            .with_retry_delay_ms(50, 400);

        assert_eq!(config.worker_id, "worker-1");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.handler_timeout_ms, 1_000);
        assert_eq!(config.retry_base_delay_ms, 50);
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        let config = QueueConfig::new().with_retry_delay_ms(100, 500);
        assert_eq!(config.retry_backoff(0), Duration::from_millis(100));
        assert_eq!(config.retry_backoff(1), Duration::from_millis(200));
        assert_eq!(config.retry_backoff(2), Duration::from_millis(400));
        assert_eq!(config.retry_backoff(10), Duration::from_millis(500));
    }
}
