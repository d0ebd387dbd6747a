use axum::{extract::State, Json};

use evently_core::events::{DashboardEvent, DashboardRsvp};

use crate::{context::CurrentUser, error::AppError, state::AppState};

/// Latest events of the caller with their RSVPs (GET /api/dashboard/events).
pub async fn dashboard_events(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<DashboardEvent>>, AppError> {
    let events = state.queries.dashboard_events(user_id).await?;
    Ok(Json(events))
}

/// RSVPs to the caller's events (GET /api/dashboard/rsvps).
pub async fn dashboard_rsvps(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<DashboardRsvp>>, AppError> {
    let rsvps = state.queries.dashboard_rsvps(user_id).await?;
    Ok(Json(rsvps))
}
