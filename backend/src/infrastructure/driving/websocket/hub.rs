use async_trait::async_trait;
use axum::extract::ws::Message;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::application::ports::ConnectionNotifier;
use crate::domain::ConnectionId;
use shared::EventFrame;

/// Sender half of a connection's outbound queue.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Live sockets by connection id
#[derive(Default)]
pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, ConnectionSender>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, connection_id: ConnectionId, sender: ConnectionSender) {
        self.connections.write().await.insert(connection_id, sender);
    }

    pub async fn detach(&self, connection_id: &ConnectionId) {
        self.connections.write().await.remove(connection_id);
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[async_trait]
impl ConnectionNotifier for ConnectionHub {
    async fn send_to_connection(&self, connection_id: &ConnectionId, event: &str, payload: Value) -> bool {
        let connections = self.connections.read().await;
        let Some(sender) = connections.get(connection_id) else {
            debug!(connection_id = %connection_id, event, "Push to unknown connection ignored");
            return false;
        };
        let text = match serde_json::to_string(&EventFrame::new(event, payload)) {
            Ok(text) => text,
            Err(e) => {
                warn!(connection_id = %connection_id, event, error = %e, "Failed to encode outbound event");
                return false;
            }
        };
        sender.send(Message::Text(text)).is_ok()
    }
}
