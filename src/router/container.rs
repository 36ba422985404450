use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::container::lifecycle::LifecycleManager;
use crate::container::power::{PowerAction, PowerManager};

#[derive(Clone)]
pub struct ContainerAppState {
    pub lifecycle: Arc<LifecycleManager>,
    pub power: Arc<PowerManager>,
}

pub fn container_router(lifecycle: Arc<LifecycleManager>, power: Arc<PowerManager>) -> Router {
    let state = ContainerAppState { lifecycle, power };

    Router::new()
        .route("/api/containers", get(list_containers))
        .route("/api/containers/:id", delete(delete_container))
        // Power actions
        .route("/api/containers/:id/start", post(start_container))
        .route("/api/containers/:id/stop", post(stop_container))
        .route("/api/containers/:id/restart", post(restart_container))
        .with_state(state)
}

async fn list_containers(State(state): State<ContainerAppState>) -> Response {
    match state.lifecycle.list_containers().await {
        Ok(containers) => (StatusCode::OK, Json(containers)).into_response(),
        Err(e) => {
            tracing::error!("Failed to get containers: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get containers").into_response()
        }
    }
}

async fn delete_container(
    State(state): State<ContainerAppState>,
    Path(id): Path<String>,
) -> Response {
    state.lifecycle.delete_container(&id).await.into_response()
}

async fn start_container(
    State(state): State<ContainerAppState>,
    Path(id): Path<String>,
) -> Response {
    state.power.execute_action(&id, PowerAction::Start).await.into_response()
}

async fn stop_container(
    State(state): State<ContainerAppState>,
    Path(id): Path<String>,
) -> Response {
    state.power.execute_action(&id, PowerAction::Stop).await.into_response()
}

async fn restart_container(
    State(state): State<ContainerAppState>,
    Path(id): Path<String>,
) -> Response {
    state.power.execute_action(&id, PowerAction::Restart).await.into_response()
}
