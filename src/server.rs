//! Router assembly shared by the binary and the integration tests.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws;

/// Builds the complete application: diagnostics, OpenAPI, and both
/// WebSocket endpoints, with tracing and permissive CORS.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .merge(docs_router())
        .merge(ws::handler::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url(api::OPENAPI_PATH, api::ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    api::openapi_route()
}
