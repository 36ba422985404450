use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::websocket::EventHub;

pub fn activity_router(event_hub: Arc<EventHub>) -> Router {
    Router::new()
        .route("/api/activity", get(list_activity))
        .with_state(event_hub)
}

/// Ledger contents, oldest first
async fn list_activity(State(event_hub): State<Arc<EventHub>>) -> Response {
    (StatusCode::OK, Json(event_hub.activity().await)).into_response()
}
