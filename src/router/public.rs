//! Routes that report on the daemon itself

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct PingResponse {
    status: String,
    version: String,
}

pub fn public_router(version: String) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .with_state(version)
}

async fn ping(State(version): State<String>) -> Response {
    (StatusCode::OK, Json(PingResponse {
        status: "ok".to_string(),
        version,
    })).into_response()
}
