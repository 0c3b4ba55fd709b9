// Driven port - push to a live connection (implemented by the socket gateway)

use async_trait::async_trait;
use serde_json::Value;
use crate::domain::ConnectionId;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConnectionNotifier: Send + Sync {
    /// Fire-and-forget. Returns `false` when no such connection is open.
    async fn send_to_connection(&self, connection_id: &ConnectionId, event: &str, payload: Value) -> bool;
}
