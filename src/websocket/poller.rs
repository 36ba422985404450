//! Periodic full-state refresh
//!
//! Every tick re-reads the container list and pushes it to all live clients.
//! A failed read skips the tick; the next one catches up.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::event_hub::{EventHub, OutboundEvent};

const MIN_INTERVAL: Duration = Duration::from_millis(1);
use crate::container::lifecycle::LifecycleManager;

pub struct ContainerPoller {
    lifecycle: Arc<LifecycleManager>,
    event_hub: Arc<EventHub>,
    interval: Duration,
}

impl ContainerPoller {
    pub fn new(lifecycle: Arc<LifecycleManager>, event_hub: Arc<EventHub>, interval: Duration) -> Self {
        Self {
            lifecycle,
            event_hub,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Run until `shutdown` flips to true (or its sender is dropped)
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Container poller started ({}ms interval)", self.interval.as_millis());
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Container poller stopped");
    }

    /// One refresh. Returns whether anything was broadcast.
    pub async fn tick(&self) -> bool {
        match self.lifecycle.list_containers().await {
            Ok(containers) => {
                let delivered = self
                    .event_hub
                    .broadcast(&OutboundEvent::container_update(containers))
                    .await;
                tracing::trace!("Container refresh pushed to {} client(s)", delivered);
                true
            }
            Err(e) => {
                tracing::debug!("Skipping container refresh: {}", e);
                false
            }
        }
    }
}
