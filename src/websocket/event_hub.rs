//! Live-update event hub
//!
//! Owns the set of connected dashboard clients and the activity ledger.
//! Every event is serialized once and queued to each client without waiting;
//! a client whose queue is full or closed is evicted on the spot, so one
//! broken client never holds up the others.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::activity::{ActivityEntry, ActivityKind, ActivityLedger};
use crate::container::state::ContainerView;

/// One serialized event, shared by every client queue
pub type Frame = Arc<str>;

pub type ConnectionId = u64;

/// Events pushed TO the dashboard clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Full container list sent to a client when it connects
    Containers {
        containers: Vec<ContainerView>,
        timestamp: i64,
    },

    /// Full container list from the periodic poller
    ContainerUpdate {
        containers: Vec<ContainerView>,
        timestamp: i64,
    },

    ContainerEvent {
        #[serde(rename = "containerId")]
        container_id: String,
        action: String,
        status: String,
        message: String,
        timestamp: i64,
    },

    ImageEvent {
        #[serde(rename = "imageId")]
        image_id: String,
        action: String,
        status: String,
        message: String,
        timestamp: i64,
    },

    ActivityLog {
        log: ActivityEntry,
        timestamp: i64,
    },
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl OutboundEvent {
    pub fn containers(containers: Vec<ContainerView>) -> Self {
        Self::Containers { containers, timestamp: now() }
    }

    pub fn container_update(containers: Vec<ContainerView>) -> Self {
        Self::ContainerUpdate { containers, timestamp: now() }
    }

    pub fn container_event(container_id: &str, action: &str, status: &str, message: &str) -> Self {
        Self::ContainerEvent {
            container_id: container_id.to_string(),
            action: action.to_string(),
            status: status.to_string(),
            message: message.to_string(),
            timestamp: now(),
        }
    }

    pub fn image_event(image_id: &str, action: &str, status: &str, message: &str) -> Self {
        Self::ImageEvent {
            image_id: image_id.to_string(),
            action: action.to_string(),
            status: status.to_string(),
            message: message.to_string(),
            timestamp: now(),
        }
    }

    pub fn activity_log(log: ActivityEntry) -> Self {
        Self::ActivityLog { log, timestamp: now() }
    }

    fn to_frame(&self) -> Option<Frame> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Frame::from(json)),
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                None
            }
        }
    }
}

pub struct EventHub {
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<Frame>>>,
    ledger: Mutex<ActivityLedger>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_ledger(ActivityLedger::new())
    }

    pub fn with_ledger(ledger: ActivityLedger) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            ledger: Mutex::new(ledger),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a client. The snapshot (if any) is queued to this client only, and
    /// before any broadcast can reach it. Returns `None` when the client is
    /// already gone.
    pub async fn register(
        &self,
        sender: mpsc::Sender<Frame>,
        snapshot: Option<&OutboundEvent>,
    ) -> Option<ConnectionId> {
        let frame = snapshot.and_then(OutboundEvent::to_frame);

        let mut connections = self.connections.write().await;
        if let Some(frame) = frame {
            if sender.try_send(frame).is_err() {
                tracing::warn!("Client went away before its snapshot was delivered");
                return None;
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        connections.insert(id, sender);
        tracing::info!("Live client {} connected. Total clients: {}", id, connections.len());
        Some(id)
    }

    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            tracing::info!("Live client {} disconnected. Total clients: {}", id, connections.len());
        }
        removed
    }

    /// Deliver `event` to every live client. Returns how many received it.
    pub async fn broadcast(&self, event: &OutboundEvent) -> usize {
        let Some(frame) = event.to_frame() else {
            return 0;
        };

        let mut connections = self.connections.write().await;
        connections.retain(|id, sender| match sender.try_send(frame.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Live client {} is not keeping up, dropping it", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Live client {} already closed, dropping it", id);
                false
            }
        });
        connections.len()
    }

    /// Append to the ledger and push the entry to every client. The ledger
    /// lock is held until the broadcast is queued, so a snapshot never shows
    /// an entry that has not been sent.
    pub async fn record_activity(&self, kind: ActivityKind, message: &str, container: Option<&str>) {
        let entry = ActivityEntry::new(kind, message, container);
        let mut ledger = self.ledger.lock().await;
        ledger.append(entry.clone());
        self.broadcast(&OutboundEvent::activity_log(entry)).await;
    }

    pub async fn activity(&self) -> Vec<ActivityEntry> {
        self.ledger.lock().await.snapshot()
    }

    #[cfg(test)]
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
