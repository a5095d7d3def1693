//! Health and Stats API

use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiResult, AppState};
use crate::orchestrator::OrchestratorStats;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    /// Registered agent types
    pub agents: usize,
    /// Timestamp (ISO 8601)
    pub timestamp: String,
}

/// Health check handler
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version,
        uptime_secs: state.uptime_secs(),
        agents: state.orchestrator.registry().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Aggregate counts
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<OrchestratorStats> {
    Ok(Json(state.orchestrator.stats()?))
}
