//! HTTP endpoints (liveness and read-only presence queries).

use std::sync::Arc;

use axum::{extract::Path, extract::State, http::StatusCode, Json};

use crate::domain::UserId;
use crate::infrastructure::dto::websocket::PresenceDto;

use super::super::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Presence of a single user. Unknown users read as offline.
pub async fn get_presence(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PresenceDto>, StatusCode> {
    let user_id = UserId::new(user_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let record = state.presence.get(&user_id).await;
    Ok(Json(record.into()))
}
