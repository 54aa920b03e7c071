//! Live event fan-out over WebSocket.
//!
//! Cache events are republished onto a broadcast channel; every connected
//! client gets its own receiver and is streamed each event as one JSON text
//! frame. A client that falls too far behind skips the events it missed
//! rather than slowing the cache down.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::handlers::AppState;
use crate::events::{CacheEvent, EventSink};

/// Capacity of the broadcast channel feeding connected clients.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// == Event Broadcaster ==
/// Adapts the engine's event sink to a broadcast channel.
pub struct EventBroadcaster {
    tx: broadcast::Sender<CacheEvent>,
}

impl EventBroadcaster {
    pub fn new(tx: broadcast::Sender<CacheEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for EventBroadcaster {
    fn notify(&self, event: CacheEvent) {
        // Send only fails when no client is subscribed; that is fine.
        let _ = self.tx.send(event);
    }
}

// == WebSocket Handler ==
/// Handler for GET /ws
///
/// Upgrades the connection and streams cache events to the client.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.events.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, events))
}

async fn stream_events(socket: WebSocket, mut events: broadcast::Receiver<CacheEvent>) {
    let (mut sender, mut receiver) = socket.split();
    debug!("websocket client connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(error) => {
                            warn!(%error, "failed to serialize cache event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = receiver.next() => match message {
                // Inbound frames are not part of the protocol; only close
                // and errors matter.
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    debug!("websocket client disconnected");
}
