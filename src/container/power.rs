use std::sync::Arc;
use std::time::Duration;

use crate::activity::ActivityKind;
use crate::api::{ActionOutcome, ApiError};
use crate::engine::{with_deadline, Engine, EngineError};
use crate::websocket::{EventHub, OutboundEvent};

pub const START_DEADLINE: Duration = Duration::from_secs(10);
pub const STOP_DEADLINE: Duration = Duration::from_secs(35);
/// Engine-side wait before the container is killed
pub const STOP_GRACE: Duration = Duration::from_secs(30);
/// Fixed pause between stop and the next step. The stop is not verified.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Start,
    Stop,
    Restart,
}

impl PowerAction {
    fn name(self) -> &'static str {
        match self {
            PowerAction::Start => "start",
            PowerAction::Stop => "stop",
            PowerAction::Restart => "restart",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            PowerAction::Start => "started",
            PowerAction::Stop => "stopped",
            PowerAction::Restart => "restarted",
        }
    }

    /// Status reported to clients once the action succeeded
    fn resulting_status(self) -> &'static str {
        match self {
            PowerAction::Start | PowerAction::Restart => "running",
            PowerAction::Stop => "stopped",
        }
    }
}

/// Start, stop and restart against the engine, reporting every outcome to
/// the live clients and the activity ledger.
pub struct PowerManager {
    engine: Arc<dyn Engine>,
    event_hub: Arc<EventHub>,
}

impl PowerManager {
    pub fn new(engine: Arc<dyn Engine>, event_hub: Arc<EventHub>) -> Self {
        Self { engine, event_hub }
    }

    pub async fn execute_action(
        &self,
        container_id: &str,
        action: PowerAction,
    ) -> Result<ActionOutcome, ApiError> {
        tracing::info!("Power action for {}: {}", container_id, action.name());

        let result = match action {
            PowerAction::Start => self.start(container_id).await,
            PowerAction::Stop => self.stop(container_id).await,
            PowerAction::Restart => self.restart(container_id).await,
        };

        if let Err(e) = result {
            let error_msg = match action {
                PowerAction::Restart => format!("Failed to restart container: {}", e),
                _ => format!("Failed to {} container: {}", action.name(), e),
            };
            tracing::error!("{}", error_msg);
            self.event_hub
                .record_activity(ActivityKind::Error, &error_msg, Some(container_id))
                .await;
            return Err(ApiError::Operation(error_msg));
        }

        let success_msg = format!("Container {} {} successfully", container_id, action.past_tense());
        self.event_hub
            .broadcast(&OutboundEvent::container_event(
                container_id,
                action.name(),
                action.resulting_status(),
                &success_msg,
            ))
            .await;
        self.event_hub
            .record_activity(ActivityKind::Success, &success_msg, Some(container_id))
            .await;

        Ok(ActionOutcome::new(action.past_tense(), success_msg))
    }

    async fn start(&self, container_id: &str) -> Result<(), EngineError> {
        with_deadline("start", START_DEADLINE, self.engine.start(container_id)).await
    }

    async fn stop(&self, container_id: &str) -> Result<(), EngineError> {
        with_deadline("stop", STOP_DEADLINE, self.engine.stop(container_id, STOP_GRACE)).await
    }

    /// Stop, wait out the settle delay, start. A failed phase ends the restart
    /// with that phase's error; nothing is rolled back.
    async fn restart(&self, container_id: &str) -> Result<(), EngineError> {
        self.stop(container_id).await?;
        tokio::time::sleep(SETTLE_DELAY).await;
        self.start(container_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeEngine;
    use crate::websocket::event_hub::tests::{client, drain};

    fn setup(engine: FakeEngine) -> (Arc<FakeEngine>, Arc<EventHub>, PowerManager) {
        let engine = Arc::new(engine);
        let hub = Arc::new(EventHub::new());
        let power = PowerManager::new(engine.clone(), hub.clone());
        (engine, hub, power)
    }

    #[tokio::test]
    async fn start_emits_container_event_then_success_log() {
        let (_, hub, power) = setup(FakeEngine::new().with_container("abc123", false));
        let (_, mut rx) = client(&hub).await;

        let outcome = power.execute_action("abc123", PowerAction::Start).await.unwrap();
        assert_eq!(outcome.action, "started");

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], "container_event");
        assert_eq!(frames[0]["action"], "start");
        assert_eq!(frames[0]["status"], "running");
        assert_eq!(frames[0]["containerId"], "abc123");
        assert_eq!(frames[1]["type"], "activity_log");
        assert_eq!(frames[1]["log"]["type"], "success");
        assert_eq!(frames[1]["log"]["container"], "abc123");
    }

    #[tokio::test]
    async fn stop_uses_thirty_second_grace() {
        let (engine, _, power) = setup(FakeEngine::new().with_container("abc123", true));

        let outcome = power.execute_action("abc123", PowerAction::Stop).await.unwrap();

        assert_eq!(outcome.action, "stopped");
        assert_eq!(engine.calls(), vec!["stop:abc123:30"]);
    }

    #[tokio::test]
    async fn failed_start_logs_error_and_sends_no_container_event() {
        let (_, hub, power) = setup(
            FakeEngine::new().failing("start", EngineError::NotFound("No such container: zzz".into())),
        );
        let (_, mut rx) = client(&hub).await;

        let err = power.execute_action("zzz", PowerAction::Start).await.unwrap_err();
        assert!(matches!(err, ApiError::Operation(ref m) if m.starts_with("Failed to start container")));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "activity_log");
        assert_eq!(frames[0]["log"]["type"], "error");
        assert_eq!(hub.activity().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_start_times_out_after_ten_seconds() {
        let (_, _, power) = setup(FakeEngine::new().hanging("start"));
        let begun = tokio::time::Instant::now();

        let err = power.execute_action("abc123", PowerAction::Start).await.unwrap_err();

        assert!(begun.elapsed() >= START_DEADLINE);
        assert!(begun.elapsed() < START_DEADLINE + Duration::from_secs(1));
        assert!(err.to_string().contains("timed out after 10s"));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_stops_waits_then_starts() {
        let (engine, hub, power) = setup(FakeEngine::new().with_container("abc123", true));
        let (_, mut rx) = client(&hub).await;
        let begun = tokio::time::Instant::now();

        let outcome = power.execute_action("abc123", PowerAction::Restart).await.unwrap();

        assert_eq!(outcome.action, "restarted");
        assert_eq!(engine.calls(), vec!["stop:abc123:30", "start:abc123"]);
        assert!(begun.elapsed() >= SETTLE_DELAY);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["action"], "restart");
        assert_eq!(frames[0]["status"], "running");
    }

    #[tokio::test]
    async fn restart_surfaces_stop_failure_without_starting() {
        let (engine, _, power) = setup(
            FakeEngine::new().failing("stop", EngineError::Api("cannot stop".into())),
        );

        let err = power.execute_action("abc123", PowerAction::Restart).await.unwrap_err();

        assert!(err.to_string().contains("cannot stop"));
        assert_eq!(engine.calls(), vec!["stop:abc123:30"]);
    }
}
