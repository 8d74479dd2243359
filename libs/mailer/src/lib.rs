//! Mailer
//!
//! Email rendering and delivery for the meetup backend.
//!
//! This crate owns the notification side of the subscription pipeline:
//!
//! - [`EmailProvider`]: the delivery seam (SMTP for real use, a capturing
//!   mock for tests)
//! - [`TemplateEngine`]: handlebars rendering for the subscription email
//! - [`SubscriptionMailJob`]: the queue payload produced when a user
//!   subscribes to a meetup
//! - [`SubscriptionMailHandler`]: the registered job handler that renders
//!   the template and emails the meetup organizer

mod error;
mod handler;
mod job;
mod provider;
mod templates;

pub use error::{MailerError, MailerResult};
pub use handler::SubscriptionMailHandler;
pub use job::SubscriptionMailJob;
pub use provider::{EmailContent, EmailProvider, MockProvider, SentEmail, SmtpConfig, SmtpProvider};
pub use templates::{RenderedEmail, TemplateEngine};
