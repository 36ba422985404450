use std::sync::Arc;
use std::time::Duration;

use super::power::SETTLE_DELAY;
use super::state::ContainerView;
use crate::activity::ActivityKind;
use crate::api::{ActionOutcome, ApiError};
use crate::engine::{with_deadline, Engine, EngineError};
use crate::websocket::{EventHub, OutboundEvent};

pub const LIST_DEADLINE: Duration = Duration::from_secs(5);
pub const INSPECT_DEADLINE: Duration = Duration::from_secs(10);
pub const DELETE_STOP_DEADLINE: Duration = Duration::from_secs(15);
pub const DELETE_STOP_GRACE: Duration = Duration::from_secs(10);
pub const REMOVE_DEADLINE: Duration = Duration::from_secs(10);

/// Container listing and removal
pub struct LifecycleManager {
    engine: Arc<dyn Engine>,
    event_hub: Arc<EventHub>,
}

impl LifecycleManager {
    pub fn new(engine: Arc<dyn Engine>, event_hub: Arc<EventHub>) -> Self {
        Self { engine, event_hub }
    }

    /// Every container in any state, projected for clients
    pub async fn list_containers(&self) -> Result<Vec<ContainerView>, EngineError> {
        let containers = with_deadline(
            "list containers",
            LIST_DEADLINE,
            self.engine.list_containers(true, None),
        )
        .await?;

        Ok(containers.into_iter().map(ContainerView::from).collect())
    }

    /// Remove a container, stopping it first when it is running.
    ///
    /// The stop outcome is ignored and followed by the fixed settle delay;
    /// the removal is forced either way. A container the engine no longer
    /// knows about counts as removed.
    pub async fn delete_container(&self, container_id: &str) -> Result<ActionOutcome, ApiError> {
        let state = match with_deadline("inspect", INSPECT_DEADLINE, self.engine.inspect(container_id)).await {
            Ok(state) => state,
            Err(e) => return Err(self.fail(container_id, "Failed to inspect container", e).await),
        };

        if state.running {
            tracing::info!("Stopping running container {} before removal", container_id);
            let stopped = with_deadline(
                "stop",
                DELETE_STOP_DEADLINE,
                self.engine.stop(container_id, DELETE_STOP_GRACE),
            )
            .await;
            if let Err(e) = stopped {
                tracing::warn!("Stop before removal failed for {}: {}", container_id, e);
            }
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        match with_deadline("remove", REMOVE_DEADLINE, self.engine.remove(container_id, true)).await {
            Ok(()) => {}
            Err(EngineError::NotFound(msg)) => {
                tracing::debug!("Container {} already gone: {}", container_id, msg);
            }
            Err(e) => return Err(self.fail(container_id, "Failed to delete container", e).await),
        }

        let success_msg = format!("Container {} deleted successfully", container_id);
        self.event_hub
            .broadcast(&OutboundEvent::container_event(container_id, "delete", "deleted", &success_msg))
            .await;
        self.event_hub
            .record_activity(ActivityKind::Success, &success_msg, Some(container_id))
            .await;

        Ok(ActionOutcome::new("deleted", success_msg))
    }

    async fn fail(&self, container_id: &str, context: &str, e: EngineError) -> ApiError {
        let error_msg = format!("{}: {}", context, e);
        tracing::error!("{}", error_msg);
        self.event_hub
            .record_activity(ActivityKind::Error, &error_msg, Some(container_id))
            .await;
        ApiError::Operation(error_msg)
    }
}
