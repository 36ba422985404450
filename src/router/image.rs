use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::ApiError;
use crate::image::ImageManager;

#[derive(Clone)]
pub struct ImageAppState {
    pub images: Arc<ImageManager>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullImageRequest {
    #[serde(default)]
    image_name: String,
}

pub fn image_router(images: Arc<ImageManager>) -> Router {
    let state = ImageAppState { images };

    Router::new()
        .route("/api/images", get(list_images))
        .route("/api/images/pull", post(pull_image))
        .route("/api/images/prune", post(prune_images))
        .route("/api/images/:id", delete(delete_image))
        .with_state(state)
}

async fn list_images(State(state): State<ImageAppState>) -> Response {
    match state.images.list_images().await {
        Ok(images) => (StatusCode::OK, Json(images)).into_response(),
        Err(e) => {
            tracing::error!("Failed to get images: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get images").into_response()
        }
    }
}

async fn pull_image(
    State(state): State<ImageAppState>,
    payload: Result<Json<PullImageRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Rejected pull request: {}", e);
            return ApiError::Validation("Invalid request body".to_string()).into_response();
        }
    };

    state.images.pull_image(&request.image_name).await.into_response()
}

async fn delete_image(State(state): State<ImageAppState>, Path(id): Path<String>) -> Response {
    state.images.delete_image(&id).await.into_response()
}

async fn prune_images(State(state): State<ImageAppState>) -> Response {
    state.images.prune_images().await.into_response()
}
