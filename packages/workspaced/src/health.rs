use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::AppState;

pub async fn index_handler() -> impl IntoResponse {
    "workspaced: code workspace backend"
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "session": state.session.name,
        "orchestrator": state.orchestrator.is_some(),
    }))
}
