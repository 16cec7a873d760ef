/**
 * Event Routes
 * Admin event management and public registration
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::EventRegistration;
use crate::error::AppError;
use crate::routes::{AdminQuery, AdminRequest, AppState, DeletedResponse};
use crate::services::events::{CreateEventInput, EventView, RegistrationInput, UpdateEventInput};

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event: EventView,
}

#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub events: Vec<EventView>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub registration: EventRegistration,
}

#[derive(Debug, Serialize)]
pub struct RegistrationListResponse {
    pub registrations: Vec<EventRegistration>,
    pub total: usize,
}

/// GET /api/events?admin_email=
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<EventListResponse>, AppError> {
    let events = state.events.get_all_events(&query.admin_email).await?;
    let total = events.len();
    Ok(Json(EventListResponse { events, total }))
}

/// GET /api/events/slug/{slug}
pub async fn get_event_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state
        .events
        .get_event_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(Json(EventResponse { event }))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<AdminRequest<CreateEventInput>>,
) -> Result<impl IntoResponse, AppError> {
    let event = state
        .events
        .create_event(&payload.admin_email, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(EventResponse { event })))
}

/// PATCH /api/events/{id}
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<AdminRequest<UpdateEventInput>>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state
        .events
        .update_event(&payload.admin_email, event_id, payload.body)
        .await?;
    Ok(Json(EventResponse { event }))
}

/// DELETE /api/events/{id}?admin_email=
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = state
        .events
        .delete_event(&query.admin_email, event_id)
        .await?;
    Ok(Json(DeletedResponse { success: true, id }))
}

/// POST /api/events/{id}/register - public
pub async fn register(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<RegistrationInput>,
) -> Result<impl IntoResponse, AppError> {
    let registration = state.events.register_for_event(event_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse { registration }),
    ))
}

/// GET /api/events/{id}/registrations?admin_email=
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<RegistrationListResponse>, AppError> {
    let registrations = state
        .events
        .get_event_registrations(&query.admin_email, event_id)
        .await?;
    let total = registrations.len();
    Ok(Json(RegistrationListResponse {
        registrations,
        total,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{id}", patch(update_event).delete(delete_event))
        .route("/api/events/slug/{slug}", get(get_event_by_slug))
        .route("/api/events/{id}/register", post(register))
        .route("/api/events/{id}/registrations", get(list_registrations))
}
