//! Persistence boundary for the meetups domain.
//!
//! `MeetupStore` is the trait the service talks to; `MemoryStore` is the
//! in-memory implementation used for development and tests. The Postgres
//! implementation lives in [`crate::postgres`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{MeetupError, MeetupResult};
use crate::models::{
    Meetup, MeetupFilter, MeetupWithOrganizer, Subscription, SubscriptionWithMeetup, User,
};

/// Store trait for the meetups domain.
///
/// `create_subscription` is the concurrency-critical operation: it must
/// atomically re-check the user/date uniqueness invariant and fail with
/// [`MeetupError::ScheduleConflict`] if another subscription for the same
/// user at the same instant already exists. The service's earlier conflict
/// probe exists for error-reporting order; this is the backstop that holds
/// under racing requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeetupStore: Send + Sync {
    // Users
    async fn create_user(&self, user: User) -> MeetupResult<User>;
    async fn user_by_id(&self, id: Uuid) -> MeetupResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> MeetupResult<Option<User>>;
    async fn list_users(&self) -> MeetupResult<Vec<User>>;
    async fn update_user(&self, user: User) -> MeetupResult<User>;

    // Meetups
    async fn create_meetup(&self, meetup: Meetup) -> MeetupResult<Meetup>;
    async fn meetup_by_id(&self, id: Uuid) -> MeetupResult<Option<Meetup>>;
    /// Denormalized read: the meetup with its organizer embedded.
    async fn meetup_with_organizer(&self, id: Uuid) -> MeetupResult<Option<MeetupWithOrganizer>>;
    async fn list_meetups(&self, filter: MeetupFilter) -> MeetupResult<Vec<MeetupWithOrganizer>>;
    /// Update a meetup. A date change also moves the `meetup_date` snapshot
    /// on the meetup's subscription rows; if a subscriber already holds a
    /// subscription at the new instant the update fails with
    /// [`MeetupError::ScheduleConflict`].
    async fn update_meetup(&self, meetup: Meetup) -> MeetupResult<Meetup>;
    /// Delete a meetup and cascade its subscriptions. Returns whether a row
    /// was deleted.
    async fn delete_meetup(&self, id: Uuid) -> MeetupResult<bool>;

    // Subscriptions
    async fn create_subscription(
        &self,
        subscription: Subscription,
        meetup_date: DateTime<Utc>,
    ) -> MeetupResult<Subscription>;
    async fn has_subscription_at(
        &self,
        user_id: Uuid,
        date: DateTime<Utc>,
    ) -> MeetupResult<bool>;
    /// The user's subscriptions to meetups that have not happened yet,
    /// ordered by meetup date.
    async fn upcoming_subscriptions(
        &self,
        user_id: Uuid,
    ) -> MeetupResult<Vec<SubscriptionWithMeetup>>;
}

/// Subscription row plus the denormalized meetup date used for the
/// uniqueness invariant.
#[derive(Debug, Clone)]
struct StoredSubscription {
    subscription: Subscription,
    meetup_date: DateTime<Utc>,
}

/// In-memory implementation of MeetupStore (for development/testing).
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    meetups: Arc<RwLock<HashMap<Uuid, Meetup>>>,
    subscriptions: Arc<RwLock<HashMap<Uuid, StoredSubscription>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeetupStore for MemoryStore {
    async fn create_user(&self, user: User) -> MeetupResult<User> {
        let mut users = self.users.write().await;

        let email_exists = users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email));
        if email_exists {
            return Err(MeetupError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());
        tracing::info!(user_id = %user.id, email = %user.email, "Created user");
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> MeetupResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> MeetupResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> MeetupResult<Vec<User>> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn update_user(&self, user: User) -> MeetupResult<User> {
        let mut users = self.users.write().await;

        let email_taken = users
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email));
        if email_taken {
            return Err(MeetupError::DuplicateEmail(user.email));
        }

        if !users.contains_key(&user.id) {
            return Err(MeetupError::UserNotFound(user.id));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_meetup(&self, meetup: Meetup) -> MeetupResult<Meetup> {
        self.meetups.write().await.insert(meetup.id, meetup.clone());
        tracing::info!(meetup_id = %meetup.id, title = %meetup.title, "Created meetup");
        Ok(meetup)
    }

    async fn meetup_by_id(&self, id: Uuid) -> MeetupResult<Option<Meetup>> {
        Ok(self.meetups.read().await.get(&id).cloned())
    }

    async fn meetup_with_organizer(&self, id: Uuid) -> MeetupResult<Option<MeetupWithOrganizer>> {
        let Some(meetup) = self.meetups.read().await.get(&id).cloned() else {
            return Ok(None);
        };
        let organizer = self
            .users
            .read()
            .await
            .get(&meetup.organizer_id)
            .cloned()
            .ok_or_else(|| {
                MeetupError::Internal(format!("meetup {} has no organizer row", meetup.id))
            })?;

        Ok(Some(MeetupWithOrganizer {
            meetup,
            organizer: organizer.into(),
        }))
    }

    async fn list_meetups(&self, filter: MeetupFilter) -> MeetupResult<Vec<MeetupWithOrganizer>> {
        let meetups = self.meetups.read().await;
        let users = self.users.read().await;

        let mut result: Vec<&Meetup> = meetups
            .values()
            .filter(|m| match filter.date {
                Some(day) => m.date.date_naive() == day,
                None => true,
            })
            .collect();
        result.sort_by_key(|m| m.date);

        let page: Vec<MeetupWithOrganizer> = result
            .into_iter()
            .skip(filter.offset() as usize)
            .take(MeetupFilter::PAGE_SIZE as usize)
            .filter_map(|m| {
                users.get(&m.organizer_id).map(|u| MeetupWithOrganizer {
                    meetup: m.clone(),
                    organizer: u.clone().into(),
                })
            })
            .collect();

        Ok(page)
    }

    async fn update_meetup(&self, meetup: Meetup) -> MeetupResult<Meetup> {
        let mut meetups = self.meetups.write().await;
        let mut subscriptions = self.subscriptions.write().await;

        let Some(existing) = meetups.get(&meetup.id) else {
            return Err(MeetupError::MeetupNotFound(meetup.id));
        };

        // A rescheduled meetup drags its subscription snapshots along, so
        // the conflict check keeps evaluating the live instant. If that
        // would double-book a subscriber, the reschedule itself conflicts.
        if existing.date != meetup.date {
            let would_double_book = subscriptions.values().any(|s| {
                s.subscription.meetup_id == meetup.id
                    && subscriptions.values().any(|other| {
                        other.subscription.meetup_id != meetup.id
                            && other.subscription.user_id == s.subscription.user_id
                            && other.meetup_date == meetup.date
                    })
            });
            if would_double_book {
                return Err(MeetupError::ScheduleConflict);
            }

            for stored in subscriptions.values_mut() {
                if stored.subscription.meetup_id == meetup.id {
                    stored.meetup_date = meetup.date;
                }
            }
        }

        meetups.insert(meetup.id, meetup.clone());
        Ok(meetup)
    }

    async fn delete_meetup(&self, id: Uuid) -> MeetupResult<bool> {
        let mut meetups = self.meetups.write().await;
        let mut subscriptions = self.subscriptions.write().await;

        let removed = meetups.remove(&id).is_some();
        if removed {
            subscriptions.retain(|_, s| s.subscription.meetup_id != id);
        }
        Ok(removed)
    }

    async fn create_subscription(
        &self,
        subscription: Subscription,
        meetup_date: DateTime<Utc>,
    ) -> MeetupResult<Subscription> {
        // Check and insert under one write lock: two racing subscribes for
        // the same user and instant cannot both pass.
        let mut subscriptions = self.subscriptions.write().await;

        let conflict = subscriptions.values().any(|s| {
            s.subscription.user_id == subscription.user_id && s.meetup_date == meetup_date
        });
        if conflict {
            return Err(MeetupError::ScheduleConflict);
        }

        subscriptions.insert(
            subscription.id,
            StoredSubscription {
                subscription: subscription.clone(),
                meetup_date,
            },
        );
        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            meetup_id = %subscription.meetup_id,
            "Created subscription"
        );
        Ok(subscription)
    }

    async fn has_subscription_at(
        &self,
        user_id: Uuid,
        date: DateTime<Utc>,
    ) -> MeetupResult<bool> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .any(|s| s.subscription.user_id == user_id && s.meetup_date == date))
    }

    async fn upcoming_subscriptions(
        &self,
        user_id: Uuid,
    ) -> MeetupResult<Vec<SubscriptionWithMeetup>> {
        let subscriptions = self.subscriptions.read().await;
        let meetups = self.meetups.read().await;
        let now = Utc::now();

        let mut result: Vec<SubscriptionWithMeetup> = subscriptions
            .values()
            .filter(|s| s.subscription.user_id == user_id)
            .filter_map(|s| {
                meetups
                    .get(&s.subscription.meetup_id)
                    .filter(|m| m.date > now)
                    .map(|m| SubscriptionWithMeetup {
                        subscription: s.subscription.clone(),
                        meetup: m.clone(),
                    })
            })
            .collect();
        result.sort_by_key(|s| s.meetup.date);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(name: &str) -> User {
        User::new(
            name.into(),
            format!("{}@example.com", name.to_lowercase()),
            "hash".into(),
        )
    }

    fn meetup(organizer: &User, hours_from_now: i64) -> Meetup {
        Meetup::new(
            crate::models::CreateMeetup {
                title: "Rust Meetup".into(),
                description: "monthly".into(),
                location: "downtown".into(),
                date: Utc::now() + Duration::hours(hours_from_now),
                banner_file_id: None,
            },
            organizer.id,
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.create_user(user("Ana")).await.unwrap();

        let mut second = user("Other");
        second.email = "ANA@example.com".into();
        let err = store.create_user(second).await.unwrap_err();
        assert!(matches!(err, MeetupError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_meetup_with_organizer_join() {
        let store = MemoryStore::new();
        let ana = store.create_user(user("Ana")).await.unwrap();
        let m = store.create_meetup(meetup(&ana, 24)).await.unwrap();

        let read = store.meetup_with_organizer(m.id).await.unwrap().unwrap();
        assert_eq!(read.organizer.email, "ana@example.com");
        assert_eq!(read.meetup.id, m.id);

        assert!(
            store
                .meetup_with_organizer(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_subscription_conflict_backstop() {
        let store = MemoryStore::new();
        let ana = store.create_user(user("Ana")).await.unwrap();
        let bo = store.create_user(user("Bo")).await.unwrap();
        let m1 = store.create_meetup(meetup(&ana, 24)).await.unwrap();
        let m2 = store.create_meetup(meetup(&ana, 48)).await.unwrap();

        store
            .create_subscription(Subscription::new(bo.id, m1.id), m1.date)
            .await
            .unwrap();

        // Same user, same instant: rejected even without the service probe.
        let err = store
            .create_subscription(Subscription::new(bo.id, m2.id), m1.date)
            .await
            .unwrap_err();
        assert!(matches!(err, MeetupError::ScheduleConflict));

        // Different instant is fine.
        store
            .create_subscription(Subscription::new(bo.id, m2.id), m2.date)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reschedule_moves_subscription_instants() {
        let store = MemoryStore::new();
        let ana = store.create_user(user("Ana")).await.unwrap();
        let bo = store.create_user(user("Bo")).await.unwrap();
        let m = store.create_meetup(meetup(&ana, 24)).await.unwrap();
        let old_date = m.date;

        store
            .create_subscription(Subscription::new(bo.id, m.id), m.date)
            .await
            .unwrap();

        let mut rescheduled = m.clone();
        rescheduled.date = Utc::now() + Duration::hours(72);
        store.update_meetup(rescheduled.clone()).await.unwrap();

        // Bo's booking follows the meetup to its new instant.
        assert!(
            store
                .has_subscription_at(bo.id, rescheduled.date)
                .await
                .unwrap()
        );
        assert!(!store.has_subscription_at(bo.id, old_date).await.unwrap());
    }

    #[tokio::test]
    async fn test_reschedule_onto_booked_instant_conflicts() {
        let store = MemoryStore::new();
        let ana = store.create_user(user("Ana")).await.unwrap();
        let bo = store.create_user(user("Bo")).await.unwrap();
        let m1 = store.create_meetup(meetup(&ana, 24)).await.unwrap();
        let m2 = store.create_meetup(meetup(&ana, 48)).await.unwrap();

        for m in [&m1, &m2] {
            store
                .create_subscription(Subscription::new(bo.id, m.id), m.date)
                .await
                .unwrap();
        }

        // Moving m1 onto m2's instant would double-book Bo.
        let mut rescheduled = m1.clone();
        rescheduled.date = m2.date;
        let err = store.update_meetup(rescheduled).await.unwrap_err();
        assert!(matches!(err, MeetupError::ScheduleConflict));

        // The failed reschedule left the snapshots untouched.
        assert!(store.has_subscription_at(bo.id, m1.date).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_meetup_cascades_subscriptions() {
        let store = MemoryStore::new();
        let ana = store.create_user(user("Ana")).await.unwrap();
        let bo = store.create_user(user("Bo")).await.unwrap();
        let m = store.create_meetup(meetup(&ana, 24)).await.unwrap();

        store
            .create_subscription(Subscription::new(bo.id, m.id), m.date)
            .await
            .unwrap();

        assert!(store.delete_meetup(m.id).await.unwrap());
        assert!(!store.has_subscription_at(bo.id, m.date).await.unwrap());
        assert!(!store.delete_meetup(m.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_upcoming_subscriptions_excludes_past_meetups() {
        let store = MemoryStore::new();
        let ana = store.create_user(user("Ana")).await.unwrap();
        let bo = store.create_user(user("Bo")).await.unwrap();
        let past = store.create_meetup(meetup(&ana, -2)).await.unwrap();
        let soon = store.create_meetup(meetup(&ana, 2)).await.unwrap();
        let later = store.create_meetup(meetup(&ana, 50)).await.unwrap();

        for m in [&past, &later, &soon] {
            store
                .create_subscription(Subscription::new(bo.id, m.id), m.date)
                .await
                .unwrap();
        }

        let upcoming = store.upcoming_subscriptions(bo.id).await.unwrap();
        let ids: Vec<Uuid> = upcoming.iter().map(|s| s.meetup.id).collect();
        assert_eq!(ids, vec![soon.id, later.id]);
    }

    #[tokio::test]
    async fn test_list_meetups_day_filter_and_pagination() {
        let store = MemoryStore::new();
        let ana = store.create_user(user("Ana")).await.unwrap();

        for hour in 0..12 {
            let mut m = meetup(&ana, 24);
            m.date = (Utc::now() + Duration::days(30)).date_naive().and_hms_opt(hour, 0, 0)
                .unwrap()
                .and_utc();
            store.create_meetup(m).await.unwrap();
        }

        let day = (Utc::now() + Duration::days(30)).date_naive();
        let first = store
            .list_meetups(MeetupFilter { date: Some(day), page: 1 })
            .await
            .unwrap();
        assert_eq!(first.len(), 10);

        let second = store
            .list_meetups(MeetupFilter { date: Some(day), page: 2 })
            .await
            .unwrap();
        assert_eq!(second.len(), 2);

        let other_day = store
            .list_meetups(MeetupFilter {
                date: Some(day.succ_opt().unwrap()),
                page: 1,
            })
            .await
            .unwrap();
        assert!(other_day.is_empty());
    }
}
