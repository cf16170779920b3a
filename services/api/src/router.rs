//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the diagnostics endpoints, the WebSocket relay, the static
//! browser client and OpenAPI documentation.

use crate::{
    handlers,
    models::{DebugResponse, HealthResponse},
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::debug),
    components(schemas(HealthResponse, DebugResponse)),
    tags(
        (name = "Rev Voice API", description = "Voice relay between the browser client and the Gemini Live API")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let public_dir = app_state.config.public_dir.clone();

    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/health", get(handlers::health))
        .route("/debug", get(handlers::debug))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    // Anything not matched above is served from the static client directory.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
        .fallback_service(ServeDir::new(public_dir))
}
