//! Memory API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{ApiError, ApiResult, AppState};
use crate::error::OrchestratorError;
use crate::memory::{MemoryRecord, DEFAULT_IMPORTANCE};

/// Body of a memory write
#[derive(Debug, Deserialize)]
pub struct MemoryWrite {
    pub value: Value,
    #[serde(default = "default_importance")]
    pub importance: f64,
}

fn default_importance() -> f64 {
    DEFAULT_IMPORTANCE
}

fn not_found(owner: &str, memory_type: &str, key: &str) -> ApiError {
    ApiError(OrchestratorError::NotFound(format!(
        "memory {}/{}/{}",
        owner, memory_type, key
    )))
}

pub async fn list_memories(
    State(state): State<Arc<AppState>>,
    Path((owner, memory_type)): Path<(String, String)>,
) -> ApiResult<Vec<MemoryRecord>> {
    Ok(Json(
        state
            .orchestrator
            .memory()
            .list_by_type(&owner, &memory_type)?,
    ))
}

pub async fn get_memory(
    State(state): State<Arc<AppState>>,
    Path((owner, memory_type, key)): Path<(String, String, String)>,
) -> ApiResult<MemoryRecord> {
    state
        .orchestrator
        .memory()
        .get(&owner, &memory_type, &key)?
        .map(Json)
        .ok_or_else(|| not_found(&owner, &memory_type, &key))
}

pub async fn put_memory(
    State(state): State<Arc<AppState>>,
    Path((owner, memory_type, key)): Path<(String, String, String)>,
    Json(write): Json<MemoryWrite>,
) -> ApiResult<MemoryRecord> {
    Ok(Json(state.orchestrator.memory().upsert(
        &owner,
        &memory_type,
        &key,
        &write.value,
        write.importance,
    )?))
}

pub async fn delete_memory(
    State(state): State<Arc<AppState>>,
    Path((owner, memory_type, key)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.memory().forget(&owner, &memory_type, &key)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&owner, &memory_type, &key))
    }
}
