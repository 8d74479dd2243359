//! Email template rendering engine.
//!
//! Handlebars-based rendering; templates are registered as string constants
//! at construction time.

use crate::error::{MailerError, MailerResult};
use crate::job::SubscriptionMailJob;
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    /// HTML body content.
    pub html: String,
    /// Plain text body content.
    pub text: String,
    /// Email subject line.
    pub subject: String,
}

/// Template engine for rendering notification emails.
pub struct TemplateEngine {
    handlebars: Arc<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> MailerResult<Self> {
        let mut handlebars = Handlebars::new();

        handlebars
            .register_template_string("subscription_html", SUBSCRIPTION_HTML_TEMPLATE)
            .map_err(|e| {
                MailerError::Template(format!("Failed to register subscription_html: {}", e))
            })?;
        handlebars
            .register_template_string("subscription_text", SUBSCRIPTION_TEXT_TEMPLATE)
            .map_err(|e| {
                MailerError::Template(format!("Failed to register subscription_text: {}", e))
            })?;

        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    fn render<T: Serialize>(&self, template_name: &str, data: &T) -> MailerResult<String> {
        self.handlebars
            .render(template_name, data)
            .map_err(|e| MailerError::Template(e.to_string()))
    }

    /// Render the new-subscription notification sent to a meetup organizer.
    pub fn render_subscription(&self, job: &SubscriptionMailJob) -> MailerResult<RenderedEmail> {
        debug!(meetup = %job.meetup_title, "Rendering subscription email");

        let html = self.render("subscription_html", job)?;
        let text = self.render("subscription_text", job)?;

        Ok(RenderedEmail {
            html,
            text,
            subject: format!("New subscription to {}", job.meetup_title),
        })
    }
}

const SUBSCRIPTION_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #333;">
    <h2>Hello {{organizer_name}},</h2>
    <p><strong>{{subscriber_name}}</strong> just subscribed to your meetup
    <strong>{{meetup_title}}</strong>.</p>
    <p>You can reach them at <a href="mailto:{{subscriber_email}}">{{subscriber_email}}</a>.</p>
    <p>— Meetapp</p>
  </body>
</html>
"#;

const SUBSCRIPTION_TEXT_TEMPLATE: &str = r#"Hello {{organizer_name}},

{{subscriber_name}} just subscribed to your meetup "{{meetup_title}}".
You can reach them at {{subscriber_email}}.

— Meetapp
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_subscription() {
        let engine = TemplateEngine::new().unwrap();
        let job = SubscriptionMailJob::new(
            "Ana",
            "ana@example.com",
            "Bo",
            "bo@example.com",
            "Rust Meetup",
        );

        let rendered = engine.render_subscription(&job).unwrap();

        assert_eq!(rendered.subject, "New subscription to Rust Meetup");
        assert!(rendered.html.contains("Hello Ana"));
        assert!(rendered.html.contains("Bo"));
        assert!(rendered.html.contains("bo@example.com"));
        assert!(rendered.text.contains("\"Rust Meetup\""));
    }
}
