//! Handler registry: job type key → handler.
//!
//! The registry is built once at startup and never mutated afterwards.
//! Dispatch by string key keeps the queue usable for any future job type
//! without touching the worker.

use crate::error::JobError;
use crate::job::Job;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for job handlers.
///
/// One handler is registered per job type key; the worker invokes it with the
/// reserved job's payload.
///
/// # Example
///
/// ```ignore
/// struct SubscriptionMailHandler { /* ... */ }
///
/// #[async_trait]
/// impl JobHandler for SubscriptionMailHandler {
///     async fn handle(&self, payload: &serde_json::Value) -> Result<(), JobError> {
///         let job: SubscriptionMailJob = serde_json::from_value(payload.clone())?;
///         self.send(job).await
///     }
///
///     fn name(&self) -> &'static str {
///         "SubscriptionMailHandler"
///     }
/// }
/// ```
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Process a single job payload.
    ///
    /// Return `Ok(())` for success. Failures are retried or dead-lettered
    /// depending on the error category and the worker configuration.
    async fn handle(&self, payload: &serde_json::Value) -> Result<(), JobError>;

    /// Handler name for log output.
    fn name(&self) -> &'static str;
}

/// Static mapping from job type keys to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under an explicit job type key.
    ///
    /// Registering the same key twice is a configuration error.
    pub fn register(
        &mut self,
        job_type: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), JobError> {
        let job_type = job_type.into();
        if self.handlers.contains_key(&job_type) {
            return Err(JobError::HandlerAlreadyRegistered(job_type));
        }
        self.handlers.insert(job_type, handler);
        Ok(())
    }

    /// Register a handler under a typed job's `JOB_TYPE` key.
    pub fn register_job<J: Job>(&mut self, handler: Arc<dyn JobHandler>) -> Result<(), JobError> {
        self.register(J::JOB_TYPE, handler)
    }

    /// Look up the handler for a job type key.
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Registered job type keys.
    pub fn job_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl JobHandler for NoopHandler {
        async fn handle(&self, _payload: &serde_json::Value) -> Result<(), JobError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "NoopHandler"
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = HandlerRegistry::new();
        registry.register("mail", Arc::new(NoopHandler)).unwrap();

        assert!(registry.get("mail").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register("mail", Arc::new(NoopHandler)).unwrap();

        let err = registry.register("mail", Arc::new(NoopHandler)).unwrap_err();
        assert!(matches!(err, JobError::HandlerAlreadyRegistered(key) if key == "mail"));
    }
}
