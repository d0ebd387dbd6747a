use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use evently_core::events::Event;
use evently_core::storage::RepositoryError;

use crate::{context::CurrentUser, error::AppError, state::AppState};

/// List the caller's events (GET /api/events).
pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = state.queries.all_events(user_id).await?;
    Ok(Json(events))
}

/// Get one of the caller's events (GET /api/events/{id}).
pub async fn get_event(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .queries
        .one_event(user_id, id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "Event",
            id: id.to_string(),
        })?;

    Ok(Json(event))
}

/// Create a draft event with a generated name (POST /api/events).
pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let event = state.queries.create_new_event(user_id).await?;

    tracing::info!(event_id = %event.id, name = %event.name, "Created new event");

    Ok((StatusCode::CREATED, Json(event)))
}
