// Infrastructure layer - external concerns (Redis, WebSocket, HTTP, configuration)
// Implements interfaces defined in application layer

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use crate::application::challenge::ChallengeRelay;
use crate::application::presence::ConnectionRegistry;

pub mod config;
pub mod driven;    // Output adapters (key-value stores)
pub mod driving;   // Input adapters (WebSocket gateway, HTTP)

use driving::ConnectionHub;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub relay: Arc<ChallengeRelay>,
    pub hub: Arc<ConnectionHub>,
    /// Cancelled on shutdown; open sockets close when it fires
    pub shutdown: CancellationToken,
}
