//! Task API

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{clamp_limit, default_limit, ApiResult, AppState};
use crate::orchestrator::{SubmissionResponse, TaskSubmission};
use crate::tasks::{Task, TaskStatus};

/// Query parameters for task listings
#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Submit a task: route, execute, answer with the outcome
pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<TaskSubmission>,
) -> ApiResult<SubmissionResponse> {
    Ok(Json(state.orchestrator.submit(submission).await?))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TaskListParams>,
) -> ApiResult<Vec<Task>> {
    let limit = clamp_limit(params.limit);
    let tasks = match params.session_id {
        Some(session_id) => {
            let mut tasks = state.orchestrator.session_tasks(&session_id, limit)?;
            if let Some(status) = params.status {
                tasks.retain(|t| t.status == status);
            }
            tasks
        }
        None => state.orchestrator.tasks(params.status, limit)?,
    };
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    Ok(Json(state.orchestrator.task(&id)?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, call};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_submit_and_fetch() {
        let app = app();
        let (status, json) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({ "task_description": "send an email to the team" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["agent_type"], "communication");
        assert_eq!(json["status"], "success");
        assert_eq!(json["routing"]["source"], "keyword");
        assert_eq!(json["logs"].as_array().unwrap().len(), 1);

        let id = json["task_id"].as_str().unwrap();
        let (status, task) = call(&app, Method::GET, &format!("/api/tasks/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["status"], "completed");
        assert_eq!(task["completion_percentage"], 100);
    }

    #[tokio::test]
    async fn test_submit_explicit_agent() {
        let app = app();
        let (_, json) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({
                "task_description": "check this",
                "agent_type": "security_lab",
                "context": { "values": { "address": "0xabcdef0123" } }
            })),
        )
        .await;

        assert_eq!(json["agent_type"], "security_lab");
        assert_eq!(json["routing"]["source"], "explicit");
        assert_eq!(json["result"]["address"], "0xabcdef0123");
    }

    #[tokio::test]
    async fn test_submit_empty_description() {
        let app = app();
        let (status, json) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({ "task_description": "" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_list_tasks_by_status() {
        let app = app();
        for desc in ["generate a report", "scan for malware"] {
            call(
                &app,
                Method::POST,
                "/api/tasks",
                Some(json!({ "task_description": desc })),
            )
            .await;
        }

        let (_, all) = call(&app, Method::GET, "/api/tasks", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, failed) = call(&app, Method::GET, "/api/tasks?status=failed", None).await;
        let failed = failed.as_array().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["agent_type"], "security");
    }

    #[tokio::test]
    async fn test_list_tasks_by_session() {
        let app = app();
        for (desc, session) in [
            ("generate a report", Some("chat-1")),
            ("scan for malware", Some("chat-1")),
            ("send an email", None),
        ] {
            let mut body = json!({ "task_description": desc });
            if let Some(session) = session {
                body["session_id"] = json!(session);
            }
            call(&app, Method::POST, "/api/tasks", Some(body)).await;
        }

        let (_, session) = call(&app, Method::GET, "/api/tasks?session_id=chat-1", None).await;
        let session = session.as_array().unwrap();
        assert_eq!(session.len(), 2);
        assert!(session.iter().all(|t| t["session_id"] == "chat-1"));

        let (_, failed) = call(
            &app,
            Method::GET,
            "/api/tasks?session_id=chat-1&status=failed",
            None,
        )
        .await;
        assert_eq!(failed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let app = app();
        let (status, json) = call(&app, Method::GET, "/api/tasks/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }
}
