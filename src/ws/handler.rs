//! Axum WebSocket upgrade handlers.

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::session::Channel;

/// `GET /binary` — Upgrade to a WebSocket on the binary endpoint.
pub async fn binary_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, Channel::Binary, state))
}

/// `GET /text` — Upgrade to a WebSocket on the text endpoint.
pub async fn text_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, Channel::Text, state))
}

/// WebSocket routes for both endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/binary", get(binary_handler))
        .route("/text", get(text_handler))
}
