//! HTTP API
//!
//! REST surface over the orchestrator: task submission, agent and log
//! queries, skills, memory records and aggregate stats.
//!
//! Routes:
//! - GET /health - Health check with version and uptime
//! - POST /api/tasks - Submit a task
//! - GET /api/tasks - List tasks (?status=&session_id=&limit=)
//! - GET /api/tasks/{id} - One task
//! - GET /api/agents - List agents (?status=&category=)
//! - GET /api/agents/{id} - One agent
//! - PUT /api/agents/{id}/status - Operator status change
//! - POST /api/agents/{id}/execute - Run a task on this agent
//! - GET /api/agents/{id}/logs - Execution log (?limit=&status=)
//! - GET /api/agents/{id}/skills - Skills, most experienced first
//! - GET /api/memory/{owner}/{type} - Memory records of one type
//! - GET|PUT|DELETE /api/memory/{owner}/{type}/{key} - One memory record
//! - GET /api/stats - Aggregate counts

pub mod agents;
pub mod health;
pub mod memory;
pub mod server;
pub mod tasks;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;

pub use server::ApiServer;

/// Default page size for list endpoints
pub const DEFAULT_LIMIT: usize = 50;

/// Upper bound for `?limit=`
pub const MAX_LIMIT: usize = 500;

pub(crate) fn default_limit() -> usize {
    DEFAULT_LIMIT
}

pub(crate) fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Server start time for uptime calculation
    pub start_time: Instant,
    pub version: &'static str,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code
    pub error: String,
    /// Human-readable message
    pub message: String,
}

/// Orchestrator error as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            OrchestratorError::NotFound(_) | OrchestratorError::UnknownAgent(_) => StatusCode::NOT_FOUND,
            OrchestratorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::InvalidTransition { .. } | OrchestratorError::AgentUnavailable { .. } => {
                StatusCode::CONFLICT
            }
            OrchestratorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            OrchestratorError::Handler(_) => StatusCode::BAD_GATEWAY,
            OrchestratorError::Interrupted(_) => StatusCode::SERVICE_UNAVAILABLE,
            OrchestratorError::Persistence(_)
            | OrchestratorError::Serialization(_)
            | OrchestratorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("API error: {}", self.0);
        }
        let body = ErrorResponse {
            error: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Create the full API router
pub fn api_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::submit_task))
        .route("/api/tasks/{id}", get(tasks::get_task))
        .route("/api/agents", get(agents::list_agents))
        .route("/api/agents/{id}", get(agents::get_agent))
        .route("/api/agents/{id}/status", put(agents::set_status))
        .route("/api/agents/{id}/execute", post(agents::execute))
        .route("/api/agents/{id}/logs", get(agents::agent_logs))
        .route("/api/agents/{id}/skills", get(agents::agent_skills))
        .route("/api/memory/{owner}/{memory_type}", get(memory::list_memories))
        .route(
            "/api/memory/{owner}/{memory_type}/{key}",
            get(memory::get_memory)
                .put(memory::put_memory)
                .delete(memory::delete_memory),
        )
        .route("/api/stats", get(health::stats))
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::{app, call};
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_error_status_mapping() {
        let not_found = ApiError(OrchestratorError::NotFound("agent x".into()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict = ApiError(OrchestratorError::InvalidTransition {
            task_id: "t".into(),
            from: "failed".into(),
            to: "in_progress".into(),
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let db = ApiError(rusqlite::Error::QueryReturnedNoRows.into());
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let handler = ApiError(OrchestratorError::Handler("boom".into()));
        assert_eq!(handler.status(), StatusCode::BAD_GATEWAY);

        let timeout = ApiError(OrchestratorError::Timeout {
            agent_type: "oracle".into(),
            after_ms: 30_000,
        });
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let interrupted = ApiError(OrchestratorError::Interrupted("shutdown".into()));
        assert_eq!(interrupted.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(10_000), MAX_LIMIT);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app();
        let (status, _) = call(&app, Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
