use axum::{
    routing::{get, post},
    Router,
    response::Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use crate::domain::UserId;
use crate::infrastructure::AppState;

#[derive(Deserialize)]
pub struct PushRequest {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Lookup and push endpoints for the rest of the platform
pub fn presence_routes() -> Router<AppState> {
    Router::new()
        .route("/api/presence/:user_id", get(lookup))
        .route("/api/presence/:user_id/push", post(push))
}

async fn lookup(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let user_id = UserId::new(user_id).map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let entry = state.registry.resolve(&user_id)
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "User is not connected".to_string()))?;

    Ok(Json(json!({
        "userId": entry.user_id,
        "socketId": entry.connection_id,
    })))
}

async fn push(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<PushRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user_id = UserId::new(user_id).map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let delivered = state.registry.push_to_user(&user_id, &request.event, request.data)
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;

    if delivered {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err((StatusCode::NOT_FOUND, "User is not connected".to_string()))
    }
}
