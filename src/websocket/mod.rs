//! Live-update channel for dashboard clients
//!
//! ## Events (server -> client)
//! - `containers` - Full container list, sent once when a client connects
//! - `container_update` - Full container list from the periodic poller
//! - `container_event` - A container was started, stopped, restarted or deleted
//! - `image_event` - Image pull progress and image deletion
//! - `activity_log` - A new activity ledger entry
//!
//! Clients send nothing meaningful; the server pings them and drops those
//! that stop answering.

pub mod event_hub;
pub mod handler;
pub mod poller;

pub use event_hub::{EventHub, OutboundEvent};
pub use handler::{ws_handler, WebSocketState};
pub use poller::ContainerPoller;
