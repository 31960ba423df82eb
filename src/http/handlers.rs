//! Endpoint handlers.

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::utilities::UtilityOutput;
use crate::validation::TypedPayload;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub api_version: &'static str,
    pub environment: String,
    pub debug_mode: bool,
}

pub async fn root(State(state): State<AppState>) -> Json<Welcome> {
    Json(Welcome {
        status: "ok",
        message: "Welcome to Dev API Vault!",
        version: API_VERSION,
        environment: state.service.environment.clone(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy",
        api_version: API_VERSION,
        environment: state.service.environment.clone(),
        debug_mode: state.service.debug,
    })
}

/// Runs the utility for an admitted payload. Every `/api/v1` route lands here.
pub async fn run_utility(
    State(state): State<AppState>,
    Extension(payload): Extension<TypedPayload>,
) -> Result<Json<UtilityOutput>, ApiError> {
    let endpoint = payload.endpoint();

    state.toolkit.execute(payload).await.map(Json).map_err(|e| {
        tracing::warn!(endpoint = %endpoint, error = %e, "Utility request failed");
        ApiError::from_utility(e, state.service.debug)
    })
}
