//! Meetups domain.
//!
//! Users organize meetups, other users subscribe to them, and a successful
//! subscription enqueues a notification job for the organizer. The subscribe
//! path is the interesting part: it validates the domain rules (no
//! self-subscription, no past meetups, no double-booking at the same
//! instant), persists the subscription, and hands the mail job to the queue
//! so the request never waits on email delivery.

pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{MeetupError, MeetupResult};
pub use models::{
    CreateMeetup, CreateUser, Meetup, MeetupFilter, MeetupWithOrganizer, Subscription,
    SubscriptionWithMeetup, UpdateMeetup, UpdateUser, User, UserResponse,
};
pub use postgres::PostgresStore;
pub use repository::{MeetupStore, MemoryStore};
pub use service::MeetupService;
