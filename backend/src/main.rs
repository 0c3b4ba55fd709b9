mod domain;
mod application;
mod infrastructure;

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use application::challenge::ChallengeRelay;
use application::ports::KeyValueStore;
use application::presence::ConnectionRegistry;
use infrastructure::config::{Settings, StoreBackend};
use infrastructure::driven::persistence::{InMemoryKeyValueStore, RedisKeyValueStore};
use infrastructure::driving::{router, ConnectionHub};
use infrastructure::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("presence_relay=info,tower_http=info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Presence relay starting");

    let store: Arc<dyn KeyValueStore> = match settings.store_backend {
        StoreBackend::Redis => Arc::new(RedisKeyValueStore::connect(&settings.redis_url()).await?),
        StoreBackend::Memory => {
            info!("Using in-memory store; state is lost on restart");
            Arc::new(InMemoryKeyValueStore::new())
        }
    };

    let hub = Arc::new(ConnectionHub::new());
    let registry = Arc::new(ConnectionRegistry::new(
        Arc::clone(&store),
        hub.clone(),
        settings.key_space(),
        settings.duplicate_policy,
    ));
    let relay = Arc::new(ChallengeRelay::new(
        store,
        settings.key_space(),
        settings.challenge_ttl_secs,
    ));

    let shutdown = CancellationToken::new();
    let app = router(AppState {
        registry,
        relay,
        hub,
        shutdown: shutdown.clone(),
    });

    let listener = TcpListener::bind(settings.listen_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        duplicate_policy = ?settings.duplicate_policy,
        "Socket server is running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Presence relay stopped");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    token.cancel();
}
