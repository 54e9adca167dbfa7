use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::memory::DEFAULT_SESSION;
use crate::memory::views::{AggregateView, MemoryView, TurnReply};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    pub message: String,
}

fn default_session_id() -> String {
    DEFAULT_SESSION.to_string()
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    let reply = state
        .coordinator
        .record_turn_and_reply(&request.user_id, &request.session_id, &request.message)
        .await?;
    Ok(Json(reply))
}

pub async fn memory_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<MemoryView>, ApiError> {
    Ok(Json(state.coordinator.memory_view(&user_id).await?))
}

pub async fn aggregate_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<AggregateView>, ApiError> {
    Ok(Json(state.coordinator.aggregate_view(&user_id).await?))
}

/// Health check endpoint - returns JSON status
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
