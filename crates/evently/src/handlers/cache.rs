use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidateResponse {
    pub evicted: usize,
}

/// Invalidate cache tags (POST /api/cache/invalidate).
pub async fn invalidate(
    State(state): State<AppState>,
    Json(payload): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, AppError> {
    let evicted = state.cache.invalidate(&payload.tags).await?;

    tracing::info!(tags = ?payload.tags, evicted, "Invalidated cache tags");

    Ok(Json(InvalidateResponse { evicted }))
}
