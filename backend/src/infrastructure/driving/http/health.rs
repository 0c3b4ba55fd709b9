use axum::{
    routing::get,
    Router,
    response::Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::error;
use crate::infrastructure::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let connections = state.hub.len().await;
    match state.registry.online_count().await {
        Ok(online_users) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "connections": connections,
                "online_users": online_users,
            })),
        ),
        Err(e) => {
            error!(error = %e, "Health check could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "connections": connections,
                })),
            )
        }
    }
}
