//! Job payloads and the queue envelope.

use crate::error::JobError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Trait for typed job payloads.
///
/// A job type binds a serde payload to a stable string key. The key is what
/// the worker uses to look up the registered handler, so it must match the
/// key the handler was registered under.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct SubscriptionMailJob { /* ... */ }
///
/// impl Job for SubscriptionMailJob {
///     const JOB_TYPE: &'static str = "subscription_mail";
/// }
/// ```
pub trait Job: Serialize + DeserializeOwned + Send + Sync {
    /// Stable type key used for handler dispatch.
    const JOB_TYPE: &'static str;
}

/// A job as it lives on the queue: type key, JSON payload and bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// Unique job ID.
    pub id: Uuid,

    /// Job type key, resolved against the handler registry.
    pub job_type: String,

    /// The serialized payload.
    pub payload: serde_json::Value,

    /// How many times this job has been retried.
    pub retry_count: u32,

    /// When the job was first enqueued.
    pub enqueued_at: DateTime<Utc>,
}

impl JobEnvelope {
    /// Create an envelope from a raw type key and payload.
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: job_type.into(),
            payload,
            retry_count: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// Create an envelope from a typed job.
    pub fn from_job<J: Job>(job: &J) -> Result<Self, JobError> {
        Ok(Self::new(J::JOB_TYPE, serde_json::to_value(job)?))
    }

    /// Decode the payload back into its typed form.
    pub fn decode<J: Job>(&self) -> Result<J, JobError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// Copy of this envelope with an incremented retry count.
    pub(crate) fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct PingJob {
        target: String,
    }

    impl Job for PingJob {
        const JOB_TYPE: &'static str = "ping";
    }

    #[test]
    fn test_envelope_from_typed_job() {
        let job = PingJob {
            target: "example.com".into(),
        };
        let envelope = JobEnvelope::from_job(&job).unwrap();

        assert_eq!(envelope.job_type, "ping");
        assert_eq!(envelope.retry_count, 0);
        assert_eq!(envelope.decode::<PingJob>().unwrap(), job);
    }

    #[test]
    fn test_decode_wrong_shape_fails() {
        let envelope = JobEnvelope::new("ping", serde_json::json!({"unexpected": 1}));
        assert!(envelope.decode::<PingJob>().is_err());
    }

    #[test]
    fn test_with_retry_increments_count() {
        let envelope = JobEnvelope::new("ping", serde_json::json!({"target": "a"}));
        let retried = envelope.with_retry();

        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.id, envelope.id);
    }
}
