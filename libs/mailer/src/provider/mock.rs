//! Mock email provider for testing.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{MailerError, MailerResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock email provider that captures sent emails.
#[derive(Clone, Default)]
pub struct MockProvider {
    sent_emails: Arc<Mutex<Vec<EmailContent>>>,
    should_fail: bool,
    failure_message: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider that always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent_emails: Arc::new(Mutex::new(Vec::new())),
            should_fail: true,
            failure_message: Some(message.into()),
        }
    }

    /// Get all sent emails.
    pub async fn sent_emails(&self) -> Vec<EmailContent> {
        self.sent_emails.lock().await.clone()
    }

    /// Get the count of sent emails.
    pub async fn sent_count(&self) -> usize {
        self.sent_emails.lock().await.len()
    }

    /// Check if an email was sent to a specific address.
    pub async fn was_sent_to(&self, email: &str) -> bool {
        self.sent_emails
            .lock()
            .await
            .iter()
            .any(|e| e.to_email == email)
    }
}

#[async_trait]
impl EmailProvider for MockProvider {
    async fn send(&self, email: &EmailContent) -> MailerResult<SentEmail> {
        if self.should_fail {
            let message = self
                .failure_message
                .clone()
                .unwrap_or_else(|| "Mock failure".to_string());
            return Err(MailerError::Provider(message));
        }

        self.sent_emails.lock().await.push(email.clone());

        Ok(SentEmail {
            message_id: Some(format!("mock-{}", uuid::Uuid::new_v4())),
            accepted: true,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> MailerResult<bool> {
        Ok(!self.should_fail)
    }
}
