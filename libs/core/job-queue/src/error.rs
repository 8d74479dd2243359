//! Error types and error categorization.
//!
//! Errors are categorized to determine retry behavior:
//! - **Transient**: temporary failures, the job is re-enqueued up to the
//!   configured retry limit
//! - **Permanent**: unrecoverable errors, the job is dead-lettered immediately

use thiserror::Error;

/// Category of a job failure, used to decide whether a retry is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure, retry with backoff.
    Transient,
    /// Unrecoverable error, move to the dead-letter list immediately.
    Permanent,
}

/// Errors produced by the queue and by job handlers.
#[derive(Error, Debug)]
pub enum JobError {
    /// Job payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Handler reported a failure while processing a job.
    #[error("handler error: {message}")]
    Handler {
        message: String,
        category: ErrorCategory,
    },

    /// Handler did not finish within the configured per-job timeout.
    #[error("handler timed out after {0}ms")]
    Timeout(u64),

    /// A handler is already registered for this job type key.
    #[error("handler already registered for job type '{0}'")]
    HandlerAlreadyRegistered(String),

    /// No handler is registered for this job type key.
    #[error("no handler registered for job type '{0}'")]
    UnregisteredJobType(String),
}

impl JobError {
    /// Create a transient handler error.
    pub fn transient(message: impl Into<String>) -> Self {
        JobError::Handler {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a permanent handler error.
    pub fn permanent(message: impl Into<String>) -> Self {
        JobError::Handler {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            JobError::Serialization(_) => ErrorCategory::Permanent,
            JobError::Handler { category, .. } => *category,
            JobError::Timeout(_) => ErrorCategory::Transient,
            JobError::HandlerAlreadyRegistered(_) => ErrorCategory::Permanent,
            JobError::UnregisteredJobType(_) => ErrorCategory::Permanent,
        }
    }

    /// Check whether the job should be re-enqueued after this failure.
    pub fn should_retry(&self, retry_count: u32, max_retries: u32) -> bool {
        self.category() == ErrorCategory::Transient && retry_count < max_retries
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Serialization(err.to_string())
    }
}
