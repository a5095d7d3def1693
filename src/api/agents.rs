//! Agent API
//!
//! Read-only projections over agents, their execution logs and skills, the
//! operator status change, and direct execution on a named agent.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{clamp_limit, default_limit, ApiResult, AppState};
use crate::agent::{Agent, AgentFilter, AgentStatus};
use crate::log::{ExecutionLogEntry, ExecutionStatus};
use crate::registry::TaskContext;
use crate::skills::Skill;

/// Query parameters for log listings
#[derive(Debug, Deserialize)]
pub struct LogParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
}

/// Body of a status change
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AgentStatus,
}

/// Body of a direct execution
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub task: String,
    #[serde(default)]
    pub context: TaskContext,
}

pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AgentFilter>,
) -> ApiResult<Vec<Agent>> {
    Ok(Json(state.orchestrator.agents(&filter)?))
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Agent> {
    Ok(Json(state.orchestrator.agent(&id)?))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Agent> {
    Ok(Json(state.orchestrator.set_agent_status(&id, update.status)?))
}

pub async fn agent_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<LogParams>,
) -> ApiResult<Vec<ExecutionLogEntry>> {
    Ok(Json(state.orchestrator.agent_logs(
        &id,
        clamp_limit(params.limit),
        params.status,
    )?))
}

/// Run a task on this agent. Failures map to 404, 409, 502 or 504.
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Value> {
    Ok(Json(
        state
            .orchestrator
            .execute_on(&id, &request.task, request.context)
            .await?,
    ))
}

pub async fn agent_skills(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Skill>> {
    Ok(Json(state.orchestrator.agent_skills(&id)?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, call};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_agents_with_filters() {
        let app = app();

        let (status, all) = call(&app, Method::GET, "/api/agents", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 63);

        let (_, wallet) = call(&app, Method::GET, "/api/agents?category=wallet", None).await;
        assert_eq!(wallet.as_array().unwrap().len(), 5);

        let (_, active) = call(&app, Method::GET, "/api/agents?status=active", None).await;
        assert!(active.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_agent() {
        let app = app();

        let (status, agent) = call(&app, Method::GET, "/api/agents/kyc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(agent["status"], "idle");
        assert_eq!(agent["total_operations"], 0);

        let (status, _) = call(&app, Method::GET, "/api/agents/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_maintenance_blocks_execution() {
        let app = app();

        let (status, agent) = call(
            &app,
            Method::PUT,
            "/api/agents/kyc/status",
            Some(json!({ "status": "maintenance" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(agent["status"], "maintenance");

        let (_, response) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({ "task_description": "verify my passport" })),
        )
        .await;
        assert_eq!(response["status"], "failed");
        assert!(response["error"]
            .as_str()
            .unwrap()
            .starts_with("AgentUnavailable"));
    }

    #[tokio::test]
    async fn test_direct_execution() {
        let app = app();

        let (status, value) = call(
            &app,
            Method::POST,
            "/api/agents/security_lab/execute",
            Some(json!({ "task": "profile 0xabcdef123456" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["address"], "0xabcdef123456");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/agents/security/execute",
            Some(json!({ "task": "nothing to profile" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "handler_error");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/agents/ghost/execute",
            Some(json!({ "task": "anything" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_agent");

        call(
            &app,
            Method::PUT,
            "/api/agents/kyc/status",
            Some(json!({ "status": "maintenance" })),
        )
        .await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/agents/kyc/execute",
            Some(json!({ "task": "verify passport" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "agent_unavailable");

        // Logged like any other execution
        let (_, logs) = call(&app, Method::GET, "/api/agents/security/logs", None).await;
        assert_eq!(logs.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logs_and_skills() {
        let app = app();
        for _ in 0..3 {
            call(
                &app,
                Method::POST,
                "/api/tasks",
                Some(json!({ "task_description": "explain staking in a lesson" })),
            )
            .await;
        }

        let (status, logs) = call(&app, Method::GET, "/api/agents/education/logs?limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(logs.as_array().unwrap().len(), 2);

        let (_, failed) = call(
            &app,
            Method::GET,
            "/api/agents/education/logs?status=failed",
            None,
        )
        .await;
        assert!(failed.as_array().unwrap().is_empty());

        let (status, skills) = call(&app, Method::GET, "/api/agents/education/skills", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(skills[0]["skill_name"], "education");
        assert_eq!(skills[0]["experience_points"], 30);
    }
}
