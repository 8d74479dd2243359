//! The subscription notification job payload.

use job_queue::Job;
use serde::{Deserialize, Serialize};

/// Everything the mail handler needs to notify an organizer about a new
/// subscriber, snapshotted at enqueue time so no further lookups are needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionMailJob {
    /// Organizer display name (the recipient).
    pub organizer_name: String,
    /// Organizer email address (the recipient).
    pub organizer_email: String,
    /// Subscriber display name.
    pub subscriber_name: String,
    /// Subscriber email address.
    pub subscriber_email: String,
    /// Title of the meetup that was subscribed to.
    pub meetup_title: String,
}

impl SubscriptionMailJob {
    pub fn new(
        organizer_name: impl Into<String>,
        organizer_email: impl Into<String>,
        subscriber_name: impl Into<String>,
        subscriber_email: impl Into<String>,
        meetup_title: impl Into<String>,
    ) -> Self {
        Self {
            organizer_name: organizer_name.into(),
            organizer_email: organizer_email.into(),
            subscriber_name: subscriber_name.into(),
            subscriber_email: subscriber_email.into(),
            meetup_title: meetup_title.into(),
        }
    }
}

impl Job for SubscriptionMailJob {
    const JOB_TYPE: &'static str = "subscription_mail";
}
