//! Task Tracker
//!
//! Submitted tasks move pending -> in_progress -> completed | failed and never
//! leave a terminal state. A task that could not be started may fail straight
//! from pending. Progress is clamped to 0..=100 and only moves up.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};
use crate::storage::{now_millis, Database};

/// Default task priority (1 = highest)
pub const DEFAULT_PRIORITY: u8 = 5;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(OrchestratorError::NotFound(format!("task status {}", other))),
        }
    }
}

/// A tracked task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: u8,
    pub completion_percentage: u8,
    pub files_touched: Vec<String>,
    pub agent_type: Option<String>,
    /// Conversation or client session the task belongs to
    pub session_id: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
    /// Wall-clock time from start to completion or failure
    pub execution_time_ms: Option<u64>,
    pub created_at: i64,
    pub updated_at: i64,
}

const TASK_COLUMNS: &str = "id, description, status, priority, completion_percentage,
     files_touched, agent_type, session_id, result, error, execution_time_ms, created_at, updated_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(2)?;
    let files: String = row.get(5)?;
    let result: Option<String> = row.get(8)?;
    let execution_time_ms: Option<i64> = row.get(10)?;
    Ok(Task {
        id: row.get(0)?,
        description: row.get(1)?,
        status: status.parse().unwrap_or(TaskStatus::Failed),
        priority: row.get(3)?,
        completion_percentage: row.get(4)?,
        files_touched: serde_json::from_str(&files).unwrap_or_default(),
        agent_type: row.get(6)?,
        session_id: row.get(7)?,
        result: result.and_then(|r| serde_json::from_str(&r).ok()),
        error: row.get(9)?,
        execution_time_ms: execution_time_ms.map(|ms| ms.max(0) as u64),
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn get_task(conn: &Connection, id: &str) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
        params![id],
        task_from_row,
    )
    .optional()
}

/// Task store backed by the shared database
#[derive(Clone)]
pub struct TaskTracker {
    db: Arc<Database>,
}

impl TaskTracker {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a pending task
    pub fn create(&self, description: &str, priority: u8) -> Result<Task> {
        self.create_in_session(description, priority, None)
    }

    /// Create a pending task tagged with a session
    pub fn create_in_session(
        &self,
        description: &str,
        priority: u8,
        session_id: Option<&str>,
    ) -> Result<Task> {
        let id = Uuid::new_v4().to_string();
        let now = now_millis();
        let priority = priority.clamp(1, 10);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, description, status, priority, session_id, created_at, updated_at)
                 VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?5)",
                params![id, description, priority, session_id, now],
            )
        })?;

        debug!("Task created: {}", id);
        self.require(&id)
    }

    /// pending -> in_progress
    pub fn start(&self, id: &str, agent_type: &str) -> Result<Task> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = 'in_progress', agent_type = ?2,
                    started_at = ?3, updated_at = ?3
                 WHERE id = ?1 AND status = 'pending'",
                params![id, agent_type, now_millis()],
            )
        })?;
        self.after_transition(id, updated, TaskStatus::InProgress)
    }

    /// Report progress while in progress. The percentage never decreases and
    /// touched files accumulate without duplicates.
    pub fn progress(&self, id: &str, percentage: u8, files: &[String]) -> Result<Task> {
        let percentage = percentage.min(100);

        let updated = self.db.transaction(|tx| {
            let Some(task) = get_task(tx, id)? else {
                return Ok(0);
            };
            if task.status != TaskStatus::InProgress {
                return Ok(0);
            }

            let mut touched = task.files_touched;
            for file in files {
                if !touched.contains(file) {
                    touched.push(file.clone());
                }
            }
            let touched = serde_json::to_string(&touched)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            tx.execute(
                "UPDATE tasks SET
                    completion_percentage = MAX(completion_percentage, ?2),
                    files_touched = ?3,
                    updated_at = ?4
                 WHERE id = ?1",
                params![id, percentage, touched, now_millis()],
            )
        })?;
        self.after_transition(id, updated, TaskStatus::InProgress)
    }

    /// in_progress -> completed, at 100%
    pub fn complete(&self, id: &str, result: Option<&Value>) -> Result<Task> {
        let result = result.map(|r| r.to_string());
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = 'completed', completion_percentage = 100,
                    result = ?2, execution_time_ms = ?3 - started_at, updated_at = ?3
                 WHERE id = ?1 AND status = 'in_progress'",
                params![id, result, now_millis()],
            )
        })?;
        let task = self.after_transition(id, updated, TaskStatus::Completed)?;
        info!("Task {} completed", id);
        Ok(task)
    }

    /// pending | in_progress -> failed
    pub fn fail(&self, id: &str, error: &str) -> Result<Task> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = 'failed', error = ?2,
                    execution_time_ms = ?3 - started_at, updated_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'in_progress')",
                params![id, error, now_millis()],
            )
        })?;
        let task = self.after_transition(id, updated, TaskStatus::Failed)?;
        warn!("Task {} failed: {}", id, error);
        Ok(task)
    }

    pub fn get(&self, id: &str) -> Result<Option<Task>> {
        self.db.with_conn(|conn| get_task(conn, id))
    }

    /// Tasks newest first, optionally by status
    pub fn list(&self, status: Option<TaskStatus>, limit: usize) -> Result<Vec<Task>> {
        let status = status.map(|s| s.as_str());
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                TASK_COLUMNS
            ))?;
            let tasks = stmt
                .query_map(params![status, limit as i64], task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Tasks of one session, newest first
    pub fn list_session(&self, session_id: &str, limit: usize) -> Result<Vec<Task>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks WHERE session_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                TASK_COLUMNS
            ))?;
            let tasks = stmt
                .query_map(params![session_id, limit as i64], task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    pub fn count(&self, status: Option<TaskStatus>) -> Result<usize> {
        let status = status.map(|s| s.as_str());
        let count: i64 = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE ?1 IS NULL OR status = ?1",
                params![status],
                |row| row.get(0),
            )
        })?;
        Ok(count as usize)
    }

    fn require(&self, id: &str) -> Result<Task> {
        self.get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(format!("task {}", id)))
    }

    // Zero updated rows means the task is missing or in the wrong state
    fn after_transition(&self, id: &str, updated: usize, to: TaskStatus) -> Result<Task> {
        let task = self.require(id)?;
        if updated == 0 {
            return Err(OrchestratorError::InvalidTransition {
                task_id: id.to_string(),
                from: task.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracker() -> TaskTracker {
        TaskTracker::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn test_lifecycle() {
        let tracker = tracker();
        let task = tracker.create("scan wallet", DEFAULT_PRIORITY).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.completion_percentage, 0);

        let task = tracker.start(&task.id, "security").unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.agent_type.as_deref(), Some("security"));

        let task = tracker
            .complete(&task.id, Some(&json!({ "risk": "low" })))
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completion_percentage, 100);
        assert_eq!(task.result, Some(json!({ "risk": "low" })));
        assert!(task.execution_time_ms.is_some());
    }

    #[test]
    fn test_pending_task_can_fail() {
        let tracker = tracker();
        let task = tracker.create("never started", DEFAULT_PRIORITY).unwrap();

        let task = tracker.fail(&task.id, "store unavailable").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("store unavailable"));
        assert!(task.execution_time_ms.is_none());
        assert!(tracker.fail(&task.id, "again").is_err());
    }

    #[test]
    fn test_session_tasks() {
        let tracker = tracker();
        tracker
            .create_in_session("check balance", DEFAULT_PRIORITY, Some("chat-42"))
            .unwrap();
        tracker
            .create_in_session("send report", DEFAULT_PRIORITY, Some("chat-42"))
            .unwrap();
        tracker.create("unrelated", DEFAULT_PRIORITY).unwrap();

        let session = tracker.list_session("chat-42", 10).unwrap();
        assert_eq!(session.len(), 2);
        assert!(session
            .iter()
            .all(|t| t.session_id.as_deref() == Some("chat-42")));
        assert!(tracker.list_session("chat-7", 10).unwrap().is_empty());
    }

    #[test]
    fn test_no_resurrection() {
        let tracker = tracker();
        let task = tracker.create("t", DEFAULT_PRIORITY).unwrap();
        tracker.start(&task.id, "kyc").unwrap();
        tracker.fail(&task.id, "boom").unwrap();

        let err = tracker.start(&task.id, "kyc").unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidTransition { ref from, .. } if from == "failed"
        ));
        assert!(tracker.complete(&task.id, None).is_err());
    }

    #[test]
    fn test_cannot_complete_pending() {
        let tracker = tracker();
        let task = tracker.create("t", DEFAULT_PRIORITY).unwrap();
        assert!(matches!(
            tracker.complete(&task.id, None).unwrap_err(),
            OrchestratorError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let tracker = tracker();
        let task = tracker.create("t", DEFAULT_PRIORITY).unwrap();

        // Not started yet
        assert!(tracker.progress(&task.id, 10, &[]).is_err());

        tracker.start(&task.id, "analytics").unwrap();
        tracker
            .progress(&task.id, 60, &["a.rs".to_string()])
            .unwrap();
        let task = tracker
            .progress(&task.id, 30, &["a.rs".to_string(), "b.rs".to_string()])
            .unwrap();
        assert_eq!(task.completion_percentage, 60);
        assert_eq!(task.files_touched, vec!["a.rs", "b.rs"]);

        let task = tracker.progress(&task.id, 250, &[]).unwrap();
        assert_eq!(task.completion_percentage, 100);
    }

    #[test]
    fn test_unknown_task() {
        let tracker = tracker();
        assert!(matches!(
            tracker.start("nope", "kyc").unwrap_err(),
            OrchestratorError::NotFound(_)
        ));
        assert!(tracker.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_by_status() {
        let tracker = tracker();
        let a = tracker.create("a", DEFAULT_PRIORITY).unwrap();
        tracker.create("b", 1).unwrap();
        tracker.start(&a.id, "kyc").unwrap();

        assert_eq!(tracker.list(None, 10).unwrap().len(), 2);
        let pending = tracker.list(Some(TaskStatus::Pending), 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].description, "b");
        assert_eq!(pending[0].priority, 1);
    }
}
