//! System endpoints: health check and connected users.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::session::UserSummary;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    connected_users: usize,
}

/// Connected users listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    count: usize,
    users: Vec<UserSummary>,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp and the number of connected users.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connected_users: state.registry().len().await,
        }),
    )
}

/// `GET /users` — Connected users in join order.
#[utoipa::path(
    get,
    path = "/users",
    tag = "System",
    summary = "List connected users",
    description = "Returns every session with its ordinal and attached channels, ordered by ordinal.",
    responses(
        (status = 200, description = "Connected users", body = UsersResponse),
    )
)]
pub async fn users_handler(State(state): State<AppState>) -> impl IntoResponse {
    let users = state.registry().list_all().await;
    (
        StatusCode::OK,
        Json(UsersResponse {
            count: users.len(),
            users,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/users", get(users_handler))
}
