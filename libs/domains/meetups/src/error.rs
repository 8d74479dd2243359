use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MeetupError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Meetup not found: {0}")]
    MeetupNotFound(Uuid),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("You cannot subscribe to a meetup you organize")]
    SelfSubscription,

    #[error("You cannot subscribe to a past meetup")]
    PastMeetup,

    #[error("You already have a subscription for a meetup at this time")]
    ScheduleConflict,

    #[error("Past dates are not permitted")]
    PastDate,

    #[error("Past meetups are read-only")]
    PastMeetupReadOnly,

    #[error("Only the organizer may modify this meetup")]
    NotOrganizer,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type MeetupResult<T> = Result<T, MeetupError>;

impl IntoResponse for MeetupError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            MeetupError::UserNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("User {} not found", id),
            ),
            MeetupError::MeetupNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Meetup {} not found", id),
            ),
            MeetupError::DuplicateEmail(email) => (
                StatusCode::CONFLICT,
                "duplicate",
                format!("User with email '{}' already exists", email),
            ),
            MeetupError::SelfSubscription => (
                StatusCode::BAD_REQUEST,
                "self_subscription",
                self.to_string(),
            ),
            MeetupError::PastMeetup => {
                (StatusCode::BAD_REQUEST, "past_meetup", self.to_string())
            }
            MeetupError::ScheduleConflict => (
                StatusCode::BAD_REQUEST,
                "schedule_conflict",
                self.to_string(),
            ),
            MeetupError::PastDate => (StatusCode::BAD_REQUEST, "past_date", self.to_string()),
            MeetupError::PastMeetupReadOnly => (
                StatusCode::BAD_REQUEST,
                "past_meetup_read_only",
                self.to_string(),
            ),
            MeetupError::NotOrganizer => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            MeetupError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            MeetupError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            MeetupError::PasswordHash(msg) => {
                tracing::error!("Password hash error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            MeetupError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "type": error_type,
                    "message": message
                }
            })),
        )
            .into_response()
    }
}
