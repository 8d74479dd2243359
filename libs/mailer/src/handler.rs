//! The job handler that turns a subscription job into an organizer email.

use crate::error::MailerError;
use crate::job::SubscriptionMailJob;
use crate::provider::{EmailContent, EmailProvider};
use crate::templates::TemplateEngine;
use async_trait::async_trait;
use job_queue::{JobError, JobHandler};
use std::sync::Arc;
use tracing::info;

/// Handles `subscription_mail` jobs: renders the notification template and
/// sends exactly one email to the meetup organizer.
pub struct SubscriptionMailHandler {
    provider: Arc<dyn EmailProvider>,
    templates: Arc<TemplateEngine>,
}

impl SubscriptionMailHandler {
    pub fn new(provider: Arc<dyn EmailProvider>, templates: Arc<TemplateEngine>) -> Self {
        Self {
            provider,
            templates,
        }
    }
}

impl From<MailerError> for JobError {
    fn from(err: MailerError) -> Self {
        match err {
            // Delivery can succeed on a later attempt; everything else is a
            // payload or configuration problem.
            MailerError::Provider(msg) => JobError::transient(msg),
            other => JobError::permanent(other.to_string()),
        }
    }
}

#[async_trait]
impl JobHandler for SubscriptionMailHandler {
    async fn handle(&self, payload: &serde_json::Value) -> Result<(), JobError> {
        let job: SubscriptionMailJob = serde_json::from_value(payload.clone())?;

        let rendered = self.templates.render_subscription(&job)?;
        let email = EmailContent {
            to_email: job.organizer_email.clone(),
            to_name: job.organizer_name.clone(),
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
        };

        let sent = self.provider.send(&email).await?;

        info!(
            to = %email.to_email,
            meetup = %job.meetup_title,
            provider = self.provider.name(),
            message_id = ?sent.message_id,
            "Subscription notification sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SubscriptionMailHandler"
    }
}
