//! Email provider implementations.
//!
//! This module contains the `EmailProvider` trait and the delivery backends:
//! SMTP for real sending, and a capturing mock for tests.

mod mock;
mod smtp;

pub use mock::MockProvider;
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::MailerResult;
use async_trait::async_trait;

/// Represents a sent email with a provider-specific message ID.
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Provider-specific message ID for tracking.
    pub message_id: Option<String>,
    /// Whether the email was accepted for delivery.
    pub accepted: bool,
}

/// Email content ready for sending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailContent {
    /// Recipient email address.
    pub to_email: String,
    /// Recipient name.
    pub to_name: String,
    /// Email subject.
    pub subject: String,
    /// HTML body content.
    pub html_body: String,
    /// Plain text body content.
    pub text_body: String,
}

/// Trait for email sending providers.
///
/// Delivery failures must surface as errors: the worker's failure-reporting
/// path depends on the provider never swallowing them.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &EmailContent) -> MailerResult<SentEmail>;

    /// Get the provider name for logging.
    fn name(&self) -> &'static str;

    /// Check if the provider is healthy/configured.
    async fn health_check(&self) -> MailerResult<bool>;
}
