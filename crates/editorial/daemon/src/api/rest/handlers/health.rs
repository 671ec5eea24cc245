//! Health handler

use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub lease_duration_secs: u64,
    pub heartbeat_interval_secs: u64,
}

/// Health check endpoint. Needs no caller identity.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let locks = state.coordinator.lock_config();
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        lease_duration_secs: locks.lease_duration_secs,
        heartbeat_interval_secs: locks.heartbeat_interval_secs,
    })
}
