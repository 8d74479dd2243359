//! SMTP email provider implementation using lettre.
//!
//! Defaults target local development with MailHog/Mailpit; TLS and
//! credentials can be enabled for real SMTP servers.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{MailerError, MailerResult};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use tracing::{debug, error};

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Sender email address.
    pub from_email: String,
    /// Sender name.
    pub from_name: String,
    /// SMTP username (optional for dev servers like Mailpit).
    pub username: Option<String>,
    /// SMTP password (optional for dev servers like Mailpit).
    pub password: Option<String>,
    /// Whether to use TLS (false for local dev servers).
    pub use_tls: bool,
}

impl SmtpConfig {
    /// Create a new SMTP configuration.
    pub fn new(host: String, port: u16, from_email: String, from_name: String) -> Self {
        Self {
            host,
            port,
            from_email,
            from_name,
            username: None,
            password: None,
            use_tls: false,
        }
    }

    /// Read the configuration from `SMTP_*` environment variables, with
    /// MailHog/Mailpit-friendly defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "1025".to_string())
                .parse()
                .unwrap_or(1025),
            from_email: std::env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@localhost".to_string()),
            from_name: std::env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| "Meetapp".to_string()),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            use_tls: std::env::var("SMTP_USE_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Builder method to set TLS.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Builder method to set credentials.
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }
}

/// SMTP email provider.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: Arc<SmtpConfig>,
}

impl SmtpProvider {
    /// Create a new SMTP provider.
    pub fn new(config: SmtpConfig) -> MailerResult<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    /// Create a provider from `SMTP_*` environment variables.
    pub fn from_env() -> MailerResult<Self> {
        Self::new(SmtpConfig::from_env())
    }

    /// Build the SMTP transport based on configuration.
    fn build_transport(config: &SmtpConfig) -> MailerResult<AsyncSmtpTransport<Tokio1Executor>> {
        let transport = if config.use_tls {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailerError::Provider(format!("Failed to create SMTP relay: {}", e)))?
                .port(config.port);

            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }

            builder.build()
        } else {
            // Non-TLS transport for local dev servers like Mailpit.
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                    .port(config.port);

            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }

            builder.build()
        };

        Ok(transport)
    }

    /// Build a lettre Message from EmailContent.
    fn build_message(&self, email: &EmailContent) -> MailerResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| MailerError::InvalidAddress(format!("from address: {}", e)))?;

        let to: Mailbox = if email.to_name.is_empty() {
            email.to_email.parse()
        } else {
            format!("{} <{}>", email.to_name, email.to_email).parse()
        }
        .map_err(|e| MailerError::InvalidAddress(format!("to address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| MailerError::Provider(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailContent) -> MailerResult<SentEmail> {
        let message = self.build_message(email)?;

        match self.transport.send(message).await {
            Ok(response) => {
                debug!(
                    to = %email.to_email,
                    subject = %email.subject,
                    "Email accepted by SMTP server"
                );
                Ok(SentEmail {
                    message_id: response.message().next().map(str::to_string),
                    accepted: response.is_positive(),
                })
            }
            Err(e) => {
                error!(to = %email.to_email, error = %e, "SMTP send failed");
                Err(MailerError::Provider(format!("SMTP send failed: {}", e)))
            }
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn health_check(&self) -> MailerResult<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| MailerError::Provider(format!("SMTP connection test failed: {}", e)))
    }
}
