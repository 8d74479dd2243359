use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, FromQueryResult, Statement, TransactionTrait};
use uuid::Uuid;

use crate::error::{MeetupError, MeetupResult};
use crate::models::{
    Meetup, MeetupFilter, MeetupWithOrganizer, Subscription, SubscriptionWithMeetup, User,
    UserResponse,
};
use crate::repository::MeetupStore;

/// PostgreSQL implementation of MeetupStore using SeaORM
///
/// The `subscriptions` table denormalizes the meetup date into a
/// `meetup_date` column covered by a UNIQUE(user_id, meetup_date)
/// constraint, so the double-booking check holds at the database even
/// under concurrent requests.
#[derive(Clone)]
pub struct PostgresStore {
    db: sea_orm::DatabaseConnection,
}

impl PostgresStore {
    pub fn new(db: sea_orm::DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: sea_orm::DbErr) -> MeetupError {
    MeetupError::Internal(format!("Database error: {}", e))
}

fn is_unique_violation(e: &sea_orm::DbErr) -> bool {
    let err_str = e.to_string();
    err_str.contains("duplicate key") || err_str.contains("unique constraint")
}

/// Helper struct for deserializing user rows from the database
#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct MeetupRow {
    id: Uuid,
    title: String,
    description: String,
    location: String,
    date: DateTime<Utc>,
    organizer_id: Uuid,
    banner_file_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MeetupRow> for Meetup {
    fn from(row: MeetupRow) -> Self {
        Meetup {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            date: row.date,
            organizer_id: row.organizer_id,
            banner_file_id: row.banner_file_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Meetup row joined with its organizer, column names prefixed to avoid
/// clashes.
#[derive(Debug, FromQueryResult)]
struct MeetupOrganizerRow {
    id: Uuid,
    title: String,
    description: String,
    location: String,
    date: DateTime<Utc>,
    organizer_id: Uuid,
    banner_file_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    organizer_name: String,
    organizer_email: String,
    organizer_created_at: DateTime<Utc>,
}

impl From<MeetupOrganizerRow> for MeetupWithOrganizer {
    fn from(row: MeetupOrganizerRow) -> Self {
        MeetupWithOrganizer {
            organizer: UserResponse {
                id: row.organizer_id,
                name: row.organizer_name,
                email: row.organizer_email,
                created_at: row.organizer_created_at,
            },
            meetup: Meetup {
                id: row.id,
                title: row.title,
                description: row.description,
                location: row.location,
                date: row.date,
                organizer_id: row.organizer_id,
                banner_file_id: row.banner_file_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

const MEETUP_WITH_ORGANIZER_SELECT: &str = r#"
    SELECT m.id, m.title, m.description, m.location, m.date,
           m.organizer_id, m.banner_file_id, m.created_at, m.updated_at,
           u.name AS organizer_name, u.email AS organizer_email,
           u.created_at AS organizer_created_at
    FROM meetups m
    JOIN users u ON u.id = m.organizer_id
"#;

#[derive(Debug, FromQueryResult)]
struct SubscriptionMeetupRow {
    id: Uuid,
    user_id: Uuid,
    meetup_id: Uuid,
    created_at: DateTime<Utc>,
    meetup_title: String,
    meetup_description: String,
    meetup_location: String,
    meetup_date: DateTime<Utc>,
    meetup_organizer_id: Uuid,
    meetup_banner_file_id: Option<Uuid>,
    meetup_created_at: DateTime<Utc>,
    meetup_updated_at: DateTime<Utc>,
}

impl From<SubscriptionMeetupRow> for SubscriptionWithMeetup {
    fn from(row: SubscriptionMeetupRow) -> Self {
        SubscriptionWithMeetup {
            subscription: Subscription {
                id: row.id,
                user_id: row.user_id,
                meetup_id: row.meetup_id,
                created_at: row.created_at,
            },
            meetup: Meetup {
                id: row.meetup_id,
                title: row.meetup_title,
                description: row.meetup_description,
                location: row.meetup_location,
                date: row.meetup_date,
                organizer_id: row.meetup_organizer_id,
                banner_file_id: row.meetup_banner_file_id,
                created_at: row.meetup_created_at,
                updated_at: row.meetup_updated_at,
            },
        }
    }
}

#[async_trait]
impl MeetupStore for PostgresStore {
    async fn create_user(&self, user: User) -> MeetupResult<User> {
        let sql = r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.name.clone().into(),
                user.email.clone().into(),
                user.password_hash.clone().into(),
                user.created_at.into(),
                user.updated_at.into(),
            ],
        );

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MeetupError::DuplicateEmail(user.email.clone())
                } else {
                    db_err(e)
                }
            })?
            .ok_or_else(|| MeetupError::Internal("Failed to create user".to_string()))?;

        Ok(row.into())
    }

    async fn user_by_id(&self, id: Uuid) -> MeetupResult<Option<User>> {
        let sql = "SELECT * FROM users WHERE id = $1";

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(row.map(|r| r.into()))
    }

    async fn user_by_email(&self, email: &str) -> MeetupResult<Option<User>> {
        let sql = "SELECT * FROM users WHERE LOWER(email) = LOWER($1)";

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]);

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_users(&self) -> MeetupResult<Vec<User>> {
        let sql = "SELECT * FROM users ORDER BY created_at DESC";

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, []);

        let rows = UserRow::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_user(&self, user: User) -> MeetupResult<User> {
        let sql = r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.name.clone().into(),
                user.email.clone().into(),
                user.password_hash.clone().into(),
                user.updated_at.into(),
            ],
        );

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MeetupError::DuplicateEmail(user.email.clone())
                } else {
                    db_err(e)
                }
            })?;

        row.map(|r| r.into())
            .ok_or(MeetupError::UserNotFound(user.id))
    }

    async fn create_meetup(&self, meetup: Meetup) -> MeetupResult<Meetup> {
        let sql = r#"
            INSERT INTO meetups (id, title, description, location, date,
                                 organizer_id, banner_file_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                meetup.id.into(),
                meetup.title.clone().into(),
                meetup.description.clone().into(),
                meetup.location.clone().into(),
                meetup.date.into(),
                meetup.organizer_id.into(),
                meetup.banner_file_id.into(),
                meetup.created_at.into(),
                meetup.updated_at.into(),
            ],
        );

        let row = MeetupRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| MeetupError::Internal("Failed to create meetup".to_string()))?;

        Ok(row.into())
    }

    async fn meetup_by_id(&self, id: Uuid) -> MeetupResult<Option<Meetup>> {
        let sql = "SELECT * FROM meetups WHERE id = $1";

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let row = MeetupRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(row.map(|r| r.into()))
    }

    async fn meetup_with_organizer(&self, id: Uuid) -> MeetupResult<Option<MeetupWithOrganizer>> {
        let sql = format!("{} WHERE m.id = $1", MEETUP_WITH_ORGANIZER_SELECT);

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let row = MeetupOrganizerRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_meetups(&self, filter: MeetupFilter) -> MeetupResult<Vec<MeetupWithOrganizer>> {
        // OFFSET binds as i64, so clamp the saturated u64 before the cast.
        let offset = i64::try_from(filter.offset()).unwrap_or(i64::MAX);
        let rows = match filter.date {
            Some(day) => {
                let sql = format!(
                    "{} WHERE m.date::date = $1 ORDER BY m.date LIMIT $2 OFFSET $3",
                    MEETUP_WITH_ORGANIZER_SELECT
                );
                let stmt = Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    sql,
                    [
                        day.into(),
                        (MeetupFilter::PAGE_SIZE as i64).into(),
                        offset.into(),
                    ],
                );
                MeetupOrganizerRow::find_by_statement(stmt)
                    .all(&self.db)
                    .await
                    .map_err(db_err)?
            }
            None => {
                let sql = format!(
                    "{} ORDER BY m.date LIMIT $1 OFFSET $2",
                    MEETUP_WITH_ORGANIZER_SELECT
                );
                let stmt = Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    sql,
                    [(MeetupFilter::PAGE_SIZE as i64).into(), offset.into()],
                );
                MeetupOrganizerRow::find_by_statement(stmt)
                    .all(&self.db)
                    .await
                    .map_err(db_err)?
            }
        };

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_meetup(&self, meetup: Meetup) -> MeetupResult<Meetup> {
        // The meetup row and the meetup_date snapshots on its subscriptions
        // must move together, so both updates run in one transaction. The
        // snapshot update can trip the UNIQUE(user_id, meetup_date) index
        // when a subscriber is already booked at the new instant; that
        // surfaces as a schedule conflict and rolls the reschedule back.
        let txn = self.db.begin().await.map_err(db_err)?;

        let sql = r#"
            UPDATE meetups
            SET title = $2, description = $3, location = $4, date = $5,
                banner_file_id = $6, updated_at = $7
            WHERE id = $1
            RETURNING *
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                meetup.id.into(),
                meetup.title.clone().into(),
                meetup.description.clone().into(),
                meetup.location.clone().into(),
                meetup.date.into(),
                meetup.banner_file_id.into(),
                meetup.updated_at.into(),
            ],
        );

        let row = MeetupRow::find_by_statement(stmt)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(MeetupError::MeetupNotFound(meetup.id))?;

        let sync_sql = r#"
            UPDATE subscriptions
            SET meetup_date = $2
            WHERE meetup_id = $1 AND meetup_date <> $2
        "#;

        let sync_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sync_sql,
            [meetup.id.into(), meetup.date.into()],
        );

        txn.execute_raw(sync_stmt).await.map_err(|e| {
            if is_unique_violation(&e) {
                MeetupError::ScheduleConflict
            } else {
                db_err(e)
            }
        })?;

        txn.commit().await.map_err(db_err)?;

        Ok(row.into())
    }

    async fn delete_meetup(&self, id: Uuid) -> MeetupResult<bool> {
        // Subscriptions cascade via the foreign key.
        let sql = "DELETE FROM meetups WHERE id = $1";

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let result = self.db.execute_raw(stmt).await.map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_subscription(
        &self,
        subscription: Subscription,
        meetup_date: DateTime<Utc>,
    ) -> MeetupResult<Subscription> {
        let sql = r#"
            INSERT INTO subscriptions (id, user_id, meetup_id, meetup_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                subscription.id.into(),
                subscription.user_id.into(),
                subscription.meetup_id.into(),
                meetup_date.into(),
                subscription.created_at.into(),
            ],
        );

        self.db.execute_raw(stmt).await.map_err(|e| {
            if is_unique_violation(&e) {
                MeetupError::ScheduleConflict
            } else {
                db_err(e)
            }
        })?;

        Ok(subscription)
    }

    async fn has_subscription_at(
        &self,
        user_id: Uuid,
        date: DateTime<Utc>,
    ) -> MeetupResult<bool> {
        let sql = r#"
            SELECT EXISTS(
                SELECT 1 FROM subscriptions WHERE user_id = $1 AND meetup_date = $2
            ) as exists
        "#;

        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, sql, [user_id.into(), date.into()]);

        #[derive(FromQueryResult)]
        struct ExistsResult {
            exists: bool,
        }

        let result = ExistsResult::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(|r| r.exists).unwrap_or(false))
    }

    async fn upcoming_subscriptions(
        &self,
        user_id: Uuid,
    ) -> MeetupResult<Vec<SubscriptionWithMeetup>> {
        let sql = r#"
            SELECT s.id, s.user_id, s.meetup_id, s.created_at,
                   m.title AS meetup_title, m.description AS meetup_description,
                   m.location AS meetup_location, m.date AS meetup_date,
                   m.organizer_id AS meetup_organizer_id,
                   m.banner_file_id AS meetup_banner_file_id,
                   m.created_at AS meetup_created_at, m.updated_at AS meetup_updated_at
            FROM subscriptions s
            JOIN meetups m ON m.id = s.meetup_id
            WHERE s.user_id = $1 AND m.date > NOW()
            ORDER BY m.date
        "#;

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [user_id.into()]);

        let rows = SubscriptionMeetupRow::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}
