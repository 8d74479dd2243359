//! Domain models and request/response types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User representation returned by the API (no credential material).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// A meetup, owned by its organizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meetup {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    /// When the meetup takes place. Past meetups are read-only.
    pub date: DateTime<Utc>,
    pub organizer_id: Uuid,
    /// Optional reference to an uploaded banner (storage is external).
    pub banner_file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meetup {
    pub fn new(input: CreateMeetup, organizer_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            location: input.location,
            date: input.date,
            organizer_id,
            banner_file_id: input.banner_file_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the meetup's date is earlier than the current time.
    pub fn is_past(&self) -> bool {
        self.date < Utc::now()
    }
}

/// Denormalized read model: a meetup together with its organizer.
///
/// The subscribe path needs the organizer's name and email for the
/// notification payload; fetching them in one store call keeps the
/// validation logic free of persistence detail.
#[derive(Debug, Clone, Serialize)]
pub struct MeetupWithOrganizer {
    #[serde(flatten)]
    pub meetup: Meetup,
    pub organizer: UserResponse,
}

/// A user's subscription to a meetup. Created only through the validated
/// subscribe path; never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meetup_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(user_id: Uuid, meetup_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            meetup_id,
            created_at: Utc::now(),
        }
    }
}

/// A subscription joined with its meetup, for listing.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionWithMeetup {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub meetup: Meetup,
}

/// Create-user request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Update-user request body. Changing the password requires the old one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub old_password: Option<String>,
    pub password: Option<String>,
}

/// Create-meetup request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetup {
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub banner_file_id: Option<Uuid>,
}

/// Update-meetup request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMeetup {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub banner_file_id: Option<Uuid>,
}

/// Meetup listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetupFilter {
    /// Restrict to meetups on this calendar day (UTC).
    pub date: Option<NaiveDate>,
    /// 1-based page number; pages hold [`MeetupFilter::PAGE_SIZE`] entries.
    #[serde(default = "default_page")]
    pub page: u64,
}

impl MeetupFilter {
    pub const PAGE_SIZE: u64 = 10;

    /// Offset into the result set for this page. The page number comes
    /// straight from the query string, so the arithmetic saturates rather
    /// than trusting it to stay small.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(Self::PAGE_SIZE)
    }
}

fn default_page() -> u64 {
    1
}
