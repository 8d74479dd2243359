use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::MeetupResult;
use crate::models::{
    CreateMeetup, CreateUser, Meetup, MeetupFilter, MeetupWithOrganizer, SubscriptionWithMeetup,
    UpdateMeetup, UpdateUser, UserResponse,
};
use crate::repository::MeetupStore;
use crate::service::MeetupService;

/// Create the meetups domain router with all HTTP endpoints
pub fn router<S: MeetupStore + 'static>(service: MeetupService<S>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user))
        .route("/users/{id}/subscriptions", get(list_subscriptions))
        .route("/users/login", post(login))
        .route("/meetups", get(list_meetups).post(create_meetup))
        .route(
            "/meetups/{id}",
            get(get_meetup).put(update_meetup).delete(delete_meetup),
        )
        .route("/meetups/{id}/subscriptions", post(subscribe))
        .with_state(shared_service)
}

/// List users
///
/// GET /users
async fn list_users<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
) -> MeetupResult<Json<Vec<UserResponse>>> {
    let users = service.list_users().await?;
    Ok(Json(users))
}

/// Create a new user
///
/// POST /users
async fn create_user<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Json(input): Json<CreateUser>,
) -> MeetupResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by ID
///
/// GET /users/:id
async fn get_user<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Path(id): Path<Uuid>,
) -> MeetupResult<Json<UserResponse>> {
    let user = service.get_user(id).await?;
    Ok(Json(user))
}

/// Update a user
///
/// PUT /users/:id
async fn update_user<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> MeetupResult<Json<UserResponse>> {
    let user = service.update_user(id, input).await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Verify credentials and return the user profile
///
/// POST /users/login
async fn login<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Json(input): Json<LoginRequest>,
) -> MeetupResult<Json<UserResponse>> {
    let user = service
        .verify_credentials(&input.email, &input.password)
        .await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct CreateMeetupRequest {
    organizer_id: Uuid,
    #[serde(flatten)]
    meetup: CreateMeetup,
}

/// Create a meetup
///
/// POST /meetups
async fn create_meetup<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Json(input): Json<CreateMeetupRequest>,
) -> MeetupResult<impl IntoResponse> {
    let meetup = service
        .create_meetup(input.organizer_id, input.meetup)
        .await?;
    Ok((StatusCode::CREATED, Json(meetup)))
}

/// List meetups with optional day filter and pagination
///
/// GET /meetups?date=2026-09-12&page=2
async fn list_meetups<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Query(filter): Query<MeetupFilter>,
) -> MeetupResult<Json<Vec<MeetupWithOrganizer>>> {
    let meetups = service.list_meetups(filter).await?;
    Ok(Json(meetups))
}

/// Get a meetup with its organizer
///
/// GET /meetups/:id
async fn get_meetup<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Path(id): Path<Uuid>,
) -> MeetupResult<Json<MeetupWithOrganizer>> {
    let meetup = service.get_meetup(id).await?;
    Ok(Json(meetup))
}

#[derive(Debug, Deserialize)]
struct UpdateMeetupRequest {
    organizer_id: Uuid,
    #[serde(flatten)]
    changes: UpdateMeetup,
}

/// Update a meetup (organizer only)
///
/// PUT /meetups/:id
async fn update_meetup<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMeetupRequest>,
) -> MeetupResult<Json<Meetup>> {
    let meetup = service
        .update_meetup(input.organizer_id, id, input.changes)
        .await?;
    Ok(Json(meetup))
}

#[derive(Debug, Deserialize)]
struct DeleteMeetupQuery {
    organizer_id: Uuid,
}

/// Cancel a meetup (organizer only)
///
/// DELETE /meetups/:id?organizer_id=...
async fn delete_meetup<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteMeetupQuery>,
) -> MeetupResult<impl IntoResponse> {
    service.delete_meetup(query.organizer_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    user_id: Uuid,
}

/// Subscribe a user to a meetup
///
/// POST /meetups/:id/subscriptions
async fn subscribe<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Path(id): Path<Uuid>,
    Json(input): Json<SubscribeRequest>,
) -> MeetupResult<impl IntoResponse> {
    let subscription = service.subscribe(input.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// List a user's upcoming subscriptions
///
/// GET /users/:id/subscriptions
async fn list_subscriptions<S: MeetupStore>(
    State(service): State<Arc<MeetupService<S>>>,
    Path(id): Path<Uuid>,
) -> MeetupResult<Json<Vec<SubscriptionWithMeetup>>> {
    let subscriptions = service.list_subscriptions(id).await?;
    Ok(Json(subscriptions))
}
