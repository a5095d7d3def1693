//! Execution Log Store
//!
//! Append-only record of every handler invocation. Entries are never updated;
//! the only delete is the explicit `prune_older_than` maintenance call.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};
use crate::storage::Database;

/// Outcome of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Timeout,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "timeout" => Ok(Self::Timeout),
            other => Err(OrchestratorError::NotFound(format!("execution status {}", other))),
        }
    }
}

/// Immutable log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub execution_id: String,
    pub agent_id: String,
    pub action: String,
    pub input_summary: String,
    pub status: ExecutionStatus,
    pub error: Option<String>,
    pub result: Option<Value>,
    pub duration_ms: u64,
    pub created_at: i64,
}

/// Counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub timeout: u64,
}

const LOG_COLUMNS: &str =
    "execution_id, agent_id, action, input_summary, status, error, result, duration_ms, created_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionLogEntry> {
    let status: String = row.get(4)?;
    let result: Option<String> = row.get(6)?;
    Ok(ExecutionLogEntry {
        execution_id: row.get(0)?,
        agent_id: row.get(1)?,
        action: row.get(2)?,
        input_summary: row.get(3)?,
        status: status.parse().unwrap_or(ExecutionStatus::Failed),
        error: row.get(5)?,
        result: result.and_then(|r| serde_json::from_str(&r).ok()),
        duration_ms: row.get::<_, i64>(7)? as u64,
        created_at: row.get(8)?,
    })
}

/// Log store backed by the shared database
#[derive(Clone)]
pub struct ExecutionLog {
    db: Arc<Database>,
}

impl ExecutionLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one entry
    pub fn append(&self, entry: &ExecutionLogEntry) -> Result<()> {
        self.db.with_conn(|conn| append_in(conn, entry))
    }

    /// Entries for one agent, newest first
    pub fn query(
        &self,
        agent_id: &str,
        limit: usize,
        status: Option<ExecutionStatus>,
    ) -> Result<Vec<ExecutionLogEntry>> {
        let status = status.map(|s| s.as_str());
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM execution_logs
                 WHERE agent_id = ?1 AND (?2 IS NULL OR status = ?2)
                 ORDER BY id DESC LIMIT ?3",
                LOG_COLUMNS
            ))?;
            let entries = stmt
                .query_map(params![agent_id, status, limit as i64], entry_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    /// Latest entries across all agents, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM execution_logs ORDER BY id DESC LIMIT ?1",
                LOG_COLUMNS
            ))?;
            let entries = stmt
                .query_map(params![limit as i64], entry_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    /// Look up one entry by execution id
    pub fn get(&self, execution_id: &str) -> Result<Option<ExecutionLogEntry>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM execution_logs WHERE execution_id = ?1", LOG_COLUMNS),
                params![execution_id],
                entry_from_row,
            )
            .optional()
        })
    }

    /// Counts by status, for one agent or all
    pub fn stats(&self, agent_id: Option<&str>) -> Result<ExecutionStats> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM execution_logs
                 WHERE ?1 IS NULL OR agent_id = ?1
                 GROUP BY status",
            )?;
            let rows = stmt.query_map(params![agent_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?;

            let mut stats = ExecutionStats::default();
            for row in rows {
                let (status, count) = row?;
                match status.as_str() {
                    "success" => stats.success = count,
                    "failed" => stats.failed = count,
                    "timeout" => stats.timeout = count,
                    _ => {}
                }
                stats.total += count;
            }
            Ok(stats)
        })
    }

    /// Delete entries created before `cutoff_millis`. Never run automatically.
    pub fn prune_older_than(&self, cutoff_millis: i64) -> Result<usize> {
        let removed = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM execution_logs WHERE created_at < ?1",
                params![cutoff_millis],
            )
        })?;
        info!("Pruned {} execution log entries", removed);
        Ok(removed)
    }
}

/// Insert an entry on an open connection or transaction
pub(crate) fn append_in(conn: &Connection, entry: &ExecutionLogEntry) -> rusqlite::Result<()> {
    let result = entry.result.as_ref().map(|r| r.to_string());
    conn.execute(
        r#"
        INSERT INTO execution_logs
            (execution_id, agent_id, action, input_summary, status, error, result, duration_ms, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            entry.execution_id,
            entry.agent_id,
            entry.action,
            entry.input_summary,
            entry.status.as_str(),
            entry.error,
            result,
            entry.duration_ms as i64,
            entry.created_at
        ],
    )?;
    debug!("Logged execution {} ({})", entry.execution_id, entry.status);
    Ok(())
}
