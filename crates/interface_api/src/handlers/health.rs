//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use core_kernel::AdapterHealth;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: None,
    })
}

/// Readiness check (includes the ledger store)
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let result = state.service.health().await;
    let body = HealthResponse {
        status: if result.status == AdapterHealth::Unhealthy { "unavailable" } else { "ready" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: result.message,
    };
    match result.status {
        AdapterHealth::Unhealthy => Err((StatusCode::SERVICE_UNAVAILABLE, Json(body))),
        _ => Ok(Json(body)),
    }
}
