//! Realtime sync bridge: a WebSocket feed of change events so open sessions
//! can invalidate cached views after concurrent edits.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::broadcast;

use crate::dispatch::{ChangeEvent, ChangeSender};

#[derive(Clone)]
pub struct WsState {
    pub changes_tx: ChangeSender,
}

/// Client subscription message
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ClientMessage {
    /// Subscribe to change events for specific tables. An empty list
    /// subscribes to every table.
    Subscribe { tables: Vec<String> },
}

/// Server message sent to clients
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ServerMessage {
    /// Initial connection acknowledgment
    Connected { message: String },
    /// A row changed; re-read the affected collection
    Change { change: ChangeEvent },
}

/// Subscription state for one connection
#[derive(Default)]
struct Subscription {
    active: bool,
    /// Empty set = all tables
    tables: HashSet<String>,
}

impl Subscription {
    fn matches(&self, event: &ChangeEvent) -> bool {
        self.active && (self.tables.is_empty() || self.tables.contains(&event.table))
    }
}

/// WebSocket endpoint for change events
pub async fn ws_changes(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();
    let mut changes_rx = state.changes_tx.subscribe();

    let connected_msg = ServerMessage::Connected {
        message: "Connected to change feed. Send subscribe message with table names (empty for all)."
            .to_string(),
    };
    if let Ok(json) = serde_json::to_string(&connected_msg) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Channel to communicate subscriptions from receiver loop to forward task
    let (sub_tx, mut sub_rx) = tokio::sync::mpsc::channel::<Vec<String>>(16);

    let forward_task = tokio::spawn(async move {
        let mut subscription = Subscription::default();
        loop {
            tokio::select! {
                // Handle subscription updates
                Some(tables) = sub_rx.recv() => {
                    subscription.active = true;
                    subscription.tables = tables.into_iter().collect();
                }
                // Forward matching change events
                result = changes_rx.recv() => {
                    match result {
                        Ok(event) => {
                            if !subscription.matches(&event) {
                                continue;
                            }
                            let msg = ServerMessage::Change { change: event };
                            if let Ok(json) = serde_json::to_string(&msg) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        // The feed is an invalidation signal; a lagged client
                        // just re-reads on the next event
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }
    });

    // Handle incoming messages from client
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(ClientMessage::Subscribe { tables }) =
                    serde_json::from_str::<ClientMessage>(&text)
                {
                    let _ = sub_tx.send(tables).await;
                }
            }
            Ok(Message::Ping(_)) => {
                // Axum handles pong automatically
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // Cleanup
    forward_task.abort();
}
