use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::bookings::create_booking;
use crate::handlers::events::{
    create_event, delete_event, get_event_by_id, get_event_by_slug, list_events, update_event,
};
use crate::handlers::health::health_check;
use crate::state::AppState;

// Image uploads dominate request size.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:token",
            get(get_event_by_slug).put(update_event).delete(delete_event),
        )
        .route("/events/id/:id", get(get_event_by_id))
        .route("/bookings", post(create_booking))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
