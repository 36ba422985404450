use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use super::state::ImageView;
use super::throttle::ProgressThrottle;
use crate::activity::ActivityKind;
use crate::api::{ActionOutcome, ApiError};
use crate::engine::{with_deadline, Engine, EngineError};
use crate::websocket::{EventHub, OutboundEvent};

pub const LIST_DEADLINE: Duration = Duration::from_secs(5);
pub const DELETE_DEADLINE: Duration = Duration::from_secs(10);
pub const PRUNE_DEADLINE: Duration = Duration::from_secs(30);

pub struct ImageManager {
    engine: Arc<dyn Engine>,
    event_hub: Arc<EventHub>,
}

impl ImageManager {
    pub fn new(engine: Arc<dyn Engine>, event_hub: Arc<EventHub>) -> Self {
        Self { engine, event_hub }
    }

    /// All images with the number of containers built from each.
    /// A failed count lookup reports zero containers for that image.
    pub async fn list_images(&self) -> Result<Vec<ImageView>, EngineError> {
        with_deadline("list images", LIST_DEADLINE, async {
            let images = self.engine.list_images().await?;
            let mut views = Vec::with_capacity(images.len());
            for image in images {
                let containers = self
                    .engine
                    .list_containers(true, Some(&image.id))
                    .await
                    .map(|c| c.len())
                    .unwrap_or(0);
                views.push(ImageView::new(image, containers));
            }
            Ok(views)
        })
        .await
    }

    /// Pull `image_name`, streaming progress to live clients.
    ///
    /// There is no overall deadline: the pull lasts as long as the engine
    /// keeps sending, and is cancelled when this future is dropped.
    pub async fn pull_image(&self, image_name: &str) -> Result<ActionOutcome, ApiError> {
        let image_name = image_name.trim();
        if image_name.is_empty() {
            return Err(ApiError::Validation("Image name is required".to_string()));
        }

        self.event_hub
            .broadcast(&OutboundEvent::image_event(image_name, "pull", "started", "Starting image pull..."))
            .await;
        self.event_hub
            .record_activity(ActivityKind::Info, &format!("Pulling image: {}", image_name), None)
            .await;
        tracing::info!("Pulling image: {}", image_name);

        let mut stream = self.engine.pull(image_name);
        let mut throttle = ProgressThrottle::default();

        while let Some(item) = stream.next().await {
            match item {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        tracing::debug!("[{}] Image pull: {}", image_name, status);
                    }
                    if throttle.ready(tokio::time::Instant::now()) {
                        self.event_hub
                            .broadcast(&OutboundEvent::image_event(
                                image_name,
                                "pull",
                                "downloading",
                                "Downloading layers...",
                            ))
                            .await;
                    }
                }
                Err(e) => {
                    let error_msg = format!("Failed to pull image: {}", e);
                    tracing::error!("{}", error_msg);
                    self.event_hub
                        .broadcast(&OutboundEvent::image_event(image_name, "pull", "failed", &error_msg))
                        .await;
                    self.event_hub
                        .record_activity(ActivityKind::Error, &error_msg, None)
                        .await;
                    return Err(ApiError::Operation(error_msg));
                }
            }
        }

        let success_msg = format!("Image {} pulled successfully", image_name);
        self.event_hub
            .broadcast(&OutboundEvent::image_event(image_name, "pull", "completed", &success_msg))
            .await;
        self.event_hub
            .record_activity(ActivityKind::Success, &success_msg, None)
            .await;

        Ok(ActionOutcome::new("pulled", success_msg))
    }

    /// Remove an image unless some container still uses it as its ancestor.
    pub async fn delete_image(&self, image_id: &str) -> Result<ActionOutcome, ApiError> {
        let result = with_deadline("delete image", DELETE_DEADLINE, async {
            let dependents = self.engine.list_containers(true, Some(image_id)).await?;
            if !dependents.is_empty() {
                return Ok(Some(dependents.len()));
            }
            self.engine.remove_image(image_id, true).await?;
            Ok(None)
        })
        .await;

        match result {
            Ok(None) => {}
            Ok(Some(count)) => {
                let error_msg = format!(
                    "Cannot delete image {}: used by {} container(s)",
                    image_id, count
                );
                tracing::warn!("{}", error_msg);
                self.event_hub
                    .record_activity(ActivityKind::Warning, &error_msg, None)
                    .await;
                return Err(ApiError::Conflict(error_msg));
            }
            Err(e) => {
                let error_msg = format!("Failed to delete image: {}", e);
                tracing::error!("{}", error_msg);
                self.event_hub
                    .broadcast(&OutboundEvent::image_event(image_id, "delete", "failed", &error_msg))
                    .await;
                self.event_hub
                    .record_activity(ActivityKind::Error, &error_msg, None)
                    .await;
                return Err(ApiError::Operation(error_msg));
            }
        }

        let success_msg = format!("Image {} deleted successfully", image_id);
        self.event_hub
            .broadcast(&OutboundEvent::image_event(image_id, "delete", "completed", &success_msg))
            .await;
        self.event_hub
            .record_activity(ActivityKind::Success, &success_msg, None)
            .await;

        Ok(ActionOutcome::new("deleted", success_msg))
    }

    /// Remove dangling images
    pub async fn prune_images(&self) -> Result<ActionOutcome, ApiError> {
        let report = match with_deadline("prune images", PRUNE_DEADLINE, self.engine.prune_images()).await {
            Ok(report) => report,
            Err(e) => {
                let error_msg = format!("Failed to prune images: {}", e);
                tracing::error!("{}", error_msg);
                self.event_hub
                    .record_activity(ActivityKind::Error, &error_msg, None)
                    .await;
                return Err(ApiError::Operation(error_msg));
            }
        };

        let success_msg = format!(
            "Pruned {} unused image(s), reclaimed {} bytes",
            report.deleted.len(),
            report.space_reclaimed
        );
        self.event_hub
            .record_activity(ActivityKind::Success, &success_msg, None)
            .await;

        let mut outcome = ActionOutcome::new("pruned", success_msg);
        outcome.deleted = Some(report.deleted);
        outcome.space_reclaimed = Some(report.space_reclaimed);
        Ok(outcome)
    }
}
