//! Route table for the HTTP surface.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{get_conversation, list_conversations, record_feedback, AppState};
use super::ws::ws_handler;

const REST_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates the application router with all endpoints.
///
/// The request timeout covers the REST surface only; websocket sessions are
/// long-lived and carry their own per-turn deadline.
pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/:id", get(get_conversation))
        .route(
            "/conversations/:id/messages/:message_id/feedback",
            post(record_feedback),
        )
        .layer(TimeoutLayer::new(REST_REQUEST_TIMEOUT));

    Router::new()
        .nest("/api", api)
        .route("/ws/:graph", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
