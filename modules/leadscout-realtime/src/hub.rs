use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::any;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use leadscout_common::types::ActivityEvent;

use crate::bus::ActivityBus;

/// Heartbeat interval and how many unanswered pings close the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const MAX_MISSED_PONGS: u32 = 2;

/// Server→client frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once on connect so clients can confirm their binding.
    Connection { connection_id: String, user_id: String },
    Activity(ActivityEvent),
    TaskUpdate(serde_json::Value),
    Notification(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: String,
}

/// WebSocket hub: binds each connection to a user and fans that user's
/// activity stream to it in publication order. Connections are stateless —
/// a reconnect is just a new subscription, no resume bookkeeping.
pub struct WsHub {
    bus: Arc<ActivityBus>,
    heartbeat_interval: Duration,
}

impl WsHub {
    pub fn new(bus: Arc<ActivityBus>) -> Self {
        Self {
            bus,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Router fragment for the server crate to mount.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/api/ws", any(ws_handler))
            .with_state(self)
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(hub): State<Arc<WsHub>>,
) -> impl IntoResponse {
    debug!(user_id = %params.user_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, hub, params.user_id))
}

async fn handle_socket(socket: WebSocket, hub: Arc<WsHub>, user_id: String) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.bus.subscribe(&user_id).await;
    let mut heartbeat = tokio::time::interval(hub.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut missed_pongs: u32 = 0;

    info!(connection_id = %connection_id, user_id = %user_id, "WebSocket client connected");

    let hello = ServerMessage::Connection {
        connection_id: connection_id.clone(),
        user_id: user_id.clone(),
    };
    if send_json(&mut sender, &hello).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(activity) => {
                        // A send failure means the buffer is full or the
                        // socket is gone - either way, close.
                        if send_json(&mut sender, &ServerMessage::Activity(activity)).await.is_err() {
                            warn!(connection_id = %connection_id, "Send failed, closing connection");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        hub.bus.record_overflow(&user_id, skipped).await;
                        // Keep receiving - the channel resumes past the gap.
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!(connection_id = %connection_id, "Event channel closed");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if missed_pongs >= MAX_MISSED_PONGS {
                    warn!(connection_id = %connection_id, missed_pongs, "Heartbeat missed, closing connection");
                    break;
                }
                missed_pongs += 1;
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection_id = %connection_id, "Client sent close frame");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Clients don't send application frames; ignore.
                    }
                    Some(Err(e)) => {
                        warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!(connection_id = %connection_id, user_id = %user_id, "WebSocket client disconnected");
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(message)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_messages_use_tagged_wire_format() {
        let msg = ServerMessage::Connection {
            connection_id: "c1".to_string(),
            user_id: "u1".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "connection");
        assert_eq!(json["payload"]["user_id"], "u1");
    }

    #[test]
    fn activity_frame_carries_event_payload() {
        let event = ActivityEvent::new(
            "u1",
            leadscout_common::types::ActivityType::Insight,
            "Ready",
            "Insight ready",
            chrono::Utc::now(),
        );
        let json = serde_json::to_value(ServerMessage::Activity(event)).unwrap();
        assert_eq!(json["type"], "activity");
        assert_eq!(json["payload"]["title"], "Ready");
    }
}
