use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    context::USER_ID_HEADER,
    handlers::{
        cache::invalidate,
        dashboard::{dashboard_events, dashboard_rsvps},
        events::{create_event, get_event, list_events},
        health::healthz,
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
        ]);

    let api_routes = Router::new()
        // Dashboard slots
        .route("/dashboard/events", get(dashboard_events))
        .route("/dashboard/rsvps", get(dashboard_rsvps))
        // Event routes
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event))
        // Cache administration
        .route("/cache/invalidate", post(invalidate))
        .route("/healthz", get(healthz))
        .layer(cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}
