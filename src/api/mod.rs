//! HTTP diagnostics layer: route handlers and the OpenAPI document.
//!
//! The WebSocket endpoints live in [`crate::ws`]; this module only serves
//! read-only views of the session registry.

pub mod handlers;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::session::{Channel, UserSummary};
use handlers::system::{HealthResponse, UsersResponse};

/// Path the OpenAPI document is served from.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI document for the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "pointcloud-push",
        description = "Diagnostics for the point cloud push server. Data flows over the `/binary` and `/text` WebSocket endpoints."
    ),
    paths(handlers::system::health_handler, handlers::system::users_handler),
    components(schemas(HealthResponse, UsersResponse, UserSummary, Channel)),
    tags((name = "System", description = "Service status and connected users"))
)]
pub struct ApiDoc;

/// Builds the router with every HTTP endpoint.
pub fn build_router() -> Router<AppState> {
    handlers::system::routes()
}

/// Serves [`ApiDoc`] at [`OPENAPI_PATH`] without the Swagger UI.
pub fn openapi_route() -> Router<AppState> {
    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
