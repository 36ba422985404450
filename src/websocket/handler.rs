//! WebSocket handler for live dashboard connections
//!
//! Each connection runs two loops: a writer draining the client's queue and
//! pinging it, and a reader that only watches for pongs, close frames and
//! errors. Whichever loop ends first closes the connection.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant};
use tracing::debug;

use super::event_hub::{ConnectionId, EventHub, Frame, OutboundEvent};
use crate::config::config::LiveConfig;
use crate::container::lifecycle::LifecycleManager;

/// WebSocket handler state
#[derive(Clone)]
pub struct WebSocketState {
    pub event_hub: Arc<EventHub>,
    pub lifecycle: Arc<LifecycleManager>,
    pub settings: LiveConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    ClientClosed,
    ReadFailed,
    PongTimeout,
    WriteFailed,
    /// The hub dropped this client's queue after a failed broadcast
    Evicted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connected,
    Closing(CloseReason),
    Closed,
}

/// Per-connection state machine: `Connected -> Closing -> Closed`.
/// Both loops report here when they end; only the first close request counts.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    phase: ConnectionPhase,
}

type SharedConnection = Arc<Mutex<Connection>>;

impl Connection {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            phase: ConnectionPhase::Connected,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Returns false if the connection was already closing or closed
    pub fn begin_closing(&mut self, reason: CloseReason) -> bool {
        match self.phase {
            ConnectionPhase::Connected => {
                debug!("Live client {} closing: {:?}", self.id, reason);
                self.phase = ConnectionPhase::Closing(reason);
                true
            }
            _ => false,
        }
    }

    /// Returns the reason the connection closed with
    pub fn finish(&mut self) -> Option<CloseReason> {
        match self.phase {
            ConnectionPhase::Closing(reason) => {
                self.phase = ConnectionPhase::Closed;
                Some(reason)
            }
            _ => None,
        }
    }
}

/// Handle WebSocket upgrade request
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    tracing::info!("WebSocket upgrade request for live updates");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (tx, rx) = mpsc::channel(state.settings.client_buffer.max(1));

    let snapshot = match state.lifecycle.list_containers().await {
        Ok(containers) => Some(OutboundEvent::containers(containers)),
        Err(e) => {
            tracing::warn!("Error getting container list for new client: {}", e);
            None
        }
    };

    let Some(id) = state.event_hub.register(tx, snapshot.as_ref()).await else {
        return;
    };
    let connection: SharedConnection = Arc::new(Mutex::new(Connection::new(id)));

    let (sender, receiver) = socket.split();
    let ping_interval = state.settings.ping_interval();
    let pong_timeout = state.settings.pong_timeout();

    let writer = connection.clone();
    let mut send_task = tokio::spawn(async move {
        let reason = write_loop(sender, rx, ping_interval).await;
        writer.lock().await.begin_closing(reason);
    });
    let reader = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        let reason = read_loop(receiver, pong_timeout).await;
        reader.lock().await.begin_closing(reason);
    });

    // Whichever loop ends first closes the connection; a loop that died
    // without reporting still counts as a failure on its side
    tokio::select! {
        result = &mut send_task => {
            recv_task.abort();
            if result.is_err() {
                connection.lock().await.begin_closing(CloseReason::WriteFailed);
            }
        }
        result = &mut recv_task => {
            send_task.abort();
            if result.is_err() {
                connection.lock().await.begin_closing(CloseReason::ReadFailed);
            }
        }
    }

    state.event_hub.unregister(id).await;
    if let Some(reason) = connection.lock().await.finish() {
        debug!("Live client {} closed: {:?}", id, reason);
    }
}

async fn write_loop<S>(mut sender: S, mut rx: mpsc::Receiver<Frame>, ping_interval: Duration) -> CloseReason
where
    S: Sink<Message> + Unpin,
{
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    let _ = sender.send(Message::Close(None)).await;
                    return CloseReason::Evicted;
                };
                if sender.send(Message::Text(frame.to_string())).await.is_err() {
                    return CloseReason::WriteFailed;
                }
            }
            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    return CloseReason::WriteFailed;
                }
            }
        }
    }
}

async fn read_loop<S>(mut receiver: S, pong_timeout: Duration) -> CloseReason
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut deadline = Instant::now() + pong_timeout;

    loop {
        match tokio::time::timeout_at(deadline, receiver.next()).await {
            Err(_) => return CloseReason::PongTimeout,
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return CloseReason::ClientClosed,
            Ok(Some(Ok(Message::Pong(_)))) => {
                deadline = Instant::now() + pong_timeout;
            }
            Ok(Some(Ok(_))) => {
                // Inbound frames carry no commands
            }
            Ok(Some(Err(e))) => {
                tracing::warn!("Error receiving message: {}", e);
                return CloseReason::ReadFailed;
            }
        }
    }
}
