use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use job_queue::JobQueue;
use mailer::SubscriptionMailJob;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{MeetupError, MeetupResult};
use crate::models::{
    CreateMeetup, CreateUser, Meetup, MeetupFilter, MeetupWithOrganizer, Subscription,
    SubscriptionWithMeetup, UpdateMeetup, UpdateUser, User, UserResponse,
};
use crate::repository::MeetupStore;

/// Service layer for the meetups domain.
///
/// Owns the business rules; persistence goes through the store and the
/// subscription notification goes through the job queue.
#[derive(Clone)]
pub struct MeetupService<S: MeetupStore> {
    store: Arc<S>,
    queue: JobQueue,
}

impl<S: MeetupStore> MeetupService<S> {
    pub fn new(store: S, queue: JobQueue) -> Self {
        Self {
            store: Arc::new(store),
            queue,
        }
    }

    // Users

    /// Create a new user with password hashing
    pub async fn create_user(&self, input: CreateUser) -> MeetupResult<UserResponse> {
        self.validate_name(&input.name)?;
        self.validate_email(&input.email)?;
        self.validate_password(&input.password)?;

        let password_hash = self.hash_password(&input.password)?;
        let user = User::new(input.name, input.email, password_hash);

        let created = self.store.create_user(user).await?;
        Ok(created.into())
    }

    pub async fn list_users(&self) -> MeetupResult<Vec<UserResponse>> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(|u| u.into()).collect())
    }

    pub async fn get_user(&self, id: Uuid) -> MeetupResult<UserResponse> {
        let user = self
            .store
            .user_by_id(id)
            .await?
            .ok_or(MeetupError::UserNotFound(id))?;

        Ok(user.into())
    }

    /// Update a user. Changing the password requires the current one.
    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> MeetupResult<UserResponse> {
        let mut user = self
            .store
            .user_by_id(id)
            .await?
            .ok_or(MeetupError::UserNotFound(id))?;

        if let Some(ref password) = input.password {
            self.validate_password(password)?;

            let old_password = input
                .old_password
                .as_deref()
                .ok_or(MeetupError::InvalidCredentials)?;
            if !self.verify_password(old_password, &user.password_hash)? {
                return Err(MeetupError::InvalidCredentials);
            }

            user.password_hash = self.hash_password(password)?;
        }

        if let Some(name) = input.name {
            self.validate_name(&name)?;
            user.name = name;
        }
        if let Some(email) = input.email {
            self.validate_email(&email)?;
            user.email = email;
        }
        user.updated_at = Utc::now();

        let updated = self.store.update_user(user).await?;
        Ok(updated.into())
    }

    /// Verify user credentials (for login)
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> MeetupResult<UserResponse> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or(MeetupError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(MeetupError::InvalidCredentials);
        }

        Ok(user.into())
    }

    // Meetups

    /// Create a meetup. The date must be in the future.
    pub async fn create_meetup(
        &self,
        organizer_id: Uuid,
        input: CreateMeetup,
    ) -> MeetupResult<Meetup> {
        self.store
            .user_by_id(organizer_id)
            .await?
            .ok_or(MeetupError::UserNotFound(organizer_id))?;

        if input.title.trim().is_empty() {
            return Err(MeetupError::Validation("Title cannot be empty".to_string()));
        }
        if input.date < Utc::now() {
            return Err(MeetupError::PastDate);
        }

        self.store
            .create_meetup(Meetup::new(input, organizer_id))
            .await
    }

    pub async fn get_meetup(&self, id: Uuid) -> MeetupResult<MeetupWithOrganizer> {
        self.store
            .meetup_with_organizer(id)
            .await?
            .ok_or(MeetupError::MeetupNotFound(id))
    }

    pub async fn list_meetups(
        &self,
        filter: MeetupFilter,
    ) -> MeetupResult<Vec<MeetupWithOrganizer>> {
        self.store.list_meetups(filter).await
    }

    /// Update a meetup. Only the organizer may do this, and only while the
    /// meetup has not happened yet.
    pub async fn update_meetup(
        &self,
        organizer_id: Uuid,
        meetup_id: Uuid,
        input: UpdateMeetup,
    ) -> MeetupResult<Meetup> {
        let mut meetup = self
            .store
            .meetup_by_id(meetup_id)
            .await?
            .ok_or(MeetupError::MeetupNotFound(meetup_id))?;

        if meetup.organizer_id != organizer_id {
            return Err(MeetupError::NotOrganizer);
        }
        if meetup.is_past() {
            return Err(MeetupError::PastMeetupReadOnly);
        }

        if let Some(date) = input.date {
            if date < Utc::now() {
                return Err(MeetupError::PastDate);
            }
            meetup.date = date;
        }
        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(MeetupError::Validation("Title cannot be empty".to_string()));
            }
            meetup.title = title;
        }
        if let Some(description) = input.description {
            meetup.description = description;
        }
        if let Some(location) = input.location {
            meetup.location = location;
        }
        if let Some(banner_file_id) = input.banner_file_id {
            meetup.banner_file_id = Some(banner_file_id);
        }
        meetup.updated_at = Utc::now();

        self.store.update_meetup(meetup).await
    }

    /// Cancel a meetup. Organizer only, future meetups only. Subscriptions
    /// go with it.
    pub async fn delete_meetup(&self, organizer_id: Uuid, meetup_id: Uuid) -> MeetupResult<()> {
        let meetup = self
            .store
            .meetup_by_id(meetup_id)
            .await?
            .ok_or(MeetupError::MeetupNotFound(meetup_id))?;

        if meetup.organizer_id != organizer_id {
            return Err(MeetupError::NotOrganizer);
        }
        if meetup.is_past() {
            return Err(MeetupError::PastMeetupReadOnly);
        }

        if !self.store.delete_meetup(meetup_id).await? {
            return Err(MeetupError::MeetupNotFound(meetup_id));
        }
        Ok(())
    }

    // Subscriptions

    /// Subscribe a user to a meetup.
    ///
    /// Validation runs in a fixed order so the caller always gets the most
    /// specific error: unknown user, unknown meetup, own meetup, past
    /// meetup, then schedule conflict. The store's `create_subscription` is
    /// the atomic backstop for the conflict rule, so two racing requests for
    /// the same instant cannot both succeed even though the probe here ran
    /// on stale state.
    ///
    /// On success a [`SubscriptionMailJob`] is enqueued for the organizer.
    /// The subscription is already persisted at that point; a queue failure
    /// is logged, not surfaced.
    pub async fn subscribe(&self, user_id: Uuid, meetup_id: Uuid) -> MeetupResult<Subscription> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(MeetupError::UserNotFound(user_id))?;

        let MeetupWithOrganizer { meetup, organizer } = self
            .store
            .meetup_with_organizer(meetup_id)
            .await?
            .ok_or(MeetupError::MeetupNotFound(meetup_id))?;

        if meetup.organizer_id == user_id {
            return Err(MeetupError::SelfSubscription);
        }
        if meetup.is_past() {
            return Err(MeetupError::PastMeetup);
        }
        if self.store.has_subscription_at(user_id, meetup.date).await? {
            return Err(MeetupError::ScheduleConflict);
        }

        let subscription = self
            .store
            .create_subscription(Subscription::new(user_id, meetup_id), meetup.date)
            .await?;

        let job = SubscriptionMailJob::new(
            organizer.name,
            organizer.email,
            user.name,
            user.email,
            meetup.title,
        );
        match self.queue.enqueue(&job).await {
            Ok(job_id) => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    job_id = %job_id,
                    "Enqueued subscription notification"
                );
            }
            Err(e) => {
                tracing::error!(
                    subscription_id = %subscription.id,
                    error = %e,
                    "Failed to enqueue subscription notification"
                );
            }
        }

        Ok(subscription)
    }

    /// The user's upcoming subscriptions, ordered by meetup date.
    pub async fn list_subscriptions(
        &self,
        user_id: Uuid,
    ) -> MeetupResult<Vec<SubscriptionWithMeetup>> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or(MeetupError::UserNotFound(user_id))?;

        self.store.upcoming_subscriptions(user_id).await
    }

    // Password helpers

    fn hash_password(&self, password: &str) -> MeetupResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| MeetupError::PasswordHash(e.to_string()))
    }

    fn verify_password(&self, password: &str, hash: &str) -> MeetupResult<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| MeetupError::PasswordHash(e.to_string()))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    // Validation helpers

    fn validate_name(&self, name: &str) -> MeetupResult<()> {
        if name.trim().is_empty() {
            return Err(MeetupError::Validation("Name cannot be empty".to_string()));
        }
        Ok(())
    }

    fn validate_email(&self, email: &str) -> MeetupResult<()> {
        let valid = email.contains('@') && !email.starts_with('@') && !email.ends_with('@');
        if !valid {
            return Err(MeetupError::Validation(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        Ok(())
    }

    fn validate_password(&self, password: &str) -> MeetupResult<()> {
        if password.len() < 6 {
            return Err(MeetupError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        Ok(())
    }
}
