pub mod http;
pub mod websocket;

pub use http::*;
pub use websocket::{ConnectionHub, ws_handler};

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::infrastructure::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .merge(health_routes())
        .merge(presence_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
