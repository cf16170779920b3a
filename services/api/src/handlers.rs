//! Axum Handlers for the REST API
//!
//! Health and diagnostics endpoints. They use `utoipa` doc comments to
//! generate OpenAPI documentation.

use axum::{extract::State, response::Json};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    models::{DebugResponse, HealthResponse},
    state::AppState,
};

/// Report service liveness and the configured model.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::new(&state.config, Utc::now()))
}

/// Report runtime diagnostics without exposing the API key.
#[utoipa::path(
    get,
    path = "/debug",
    responses(
        (status = 200, description = "Runtime diagnostics", body = DebugResponse)
    )
)]
pub async fn debug(State(state): State<Arc<AppState>>) -> Json<DebugResponse> {
    Json(DebugResponse::from(state.config.as_ref()))
}
