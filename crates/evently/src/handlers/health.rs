//! Health check endpoint.

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// GET /api/healthz - Liveness probe.
///
/// Returns 200 immediately without touching the cache or the store.
pub async fn healthz() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
