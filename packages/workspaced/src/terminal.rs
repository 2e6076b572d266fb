use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::AppState;
use crate::bridge;

/// Upgrade the connection and hand the socket to the bridge. Refused with
/// 503 when the server started without orchestrator credentials.
pub async fn terminal_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let orchestrator = match &state.orchestrator {
        Some(o) => o.clone(),
        None => {
            warn!("terminal connection refused: no orchestrator configured");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };
    let session = state.session.clone();
    ws.on_upgrade(move |socket| bridge::run_bridge(socket, session, orchestrator))
}
