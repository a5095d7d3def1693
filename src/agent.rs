//! Agents
//!
//! An agent is a named, typed task handler with a soft lifecycle status and
//! running performance counters. Agents are created when their handler is
//! registered and are never hard-deleted.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{OrchestratorError, Result};
use crate::storage::{now_millis, Database};

/// Agent categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentCategory {
    Core,
    Financial,
    Trading,
    Wallet,
    Platform,
    Analytics,
    Nft,
    Community,
    Security,
}

impl AgentCategory {
    pub const ALL: [AgentCategory; 9] = [
        Self::Core,
        Self::Financial,
        Self::Trading,
        Self::Wallet,
        Self::Platform,
        Self::Analytics,
        Self::Nft,
        Self::Community,
        Self::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Financial => "financial",
            Self::Trading => "trading",
            Self::Wallet => "wallet",
            Self::Platform => "platform",
            Self::Analytics => "analytics",
            Self::Nft => "nft",
            Self::Community => "community",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentCategory {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| OrchestratorError::NotFound(format!("category {}", s)))
    }
}

/// Agent lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Currently running a task
    Active,
    /// Registered and available
    #[default]
    Idle,
    /// Last execution failed or timed out
    Error,
    /// Taken out of rotation by an operator
    Maintenance,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
        }
    }

    /// Whether the executor may invoke an agent in this status
    pub fn accepts_work(&self) -> bool {
        !matches!(self, Self::Maintenance)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "error" => Ok(Self::Error),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(OrchestratorError::NotFound(format!("status {}", other))),
        }
    }
}

/// Static description of an agent, supplied at registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_type: String,
    pub name: String,
    pub category: AgentCategory,
    pub capabilities: Vec<String>,
}

impl AgentDescriptor {
    pub fn new(agent_type: &str, name: &str, category: AgentCategory) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            name: name.to_string(),
            category,
            capabilities: vec![],
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Persisted agent with counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub category: AgentCategory,
    pub capabilities: Vec<String>,
    pub status: AgentStatus,
    pub total_operations: u64,
    pub successful_operations: u64,
    pub success_rate: f64,
    /// Executions started and not yet recorded
    pub active_executions: u64,
    pub current_task: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Filter for agent listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentFilter {
    pub status: Option<AgentStatus>,
    pub category: Option<AgentCategory>,
}

/// Success rate from integer counters (0 when nothing ran yet)
pub fn success_rate(successful: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64
    }
}

const AGENT_COLUMNS: &str = "id, name, category, capabilities, status, total_operations,
     successful_operations, success_rate, active_executions, current_task, created_at, updated_at";

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let category: String = row.get(2)?;
    let capabilities: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        category: category.parse().unwrap_or(AgentCategory::Core),
        capabilities: serde_json::from_str(&capabilities).unwrap_or_default(),
        status: status.parse().unwrap_or_default(),
        total_operations: row.get::<_, i64>(5)? as u64,
        successful_operations: row.get::<_, i64>(6)? as u64,
        success_rate: row.get(7)?,
        active_executions: row.get::<_, i64>(8)? as u64,
        current_task: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Agent records backed by the shared database
#[derive(Clone)]
pub struct AgentDirectory {
    db: Arc<Database>,
}

impl AgentDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert an agent, or refresh its descriptive fields. Counters survive.
    pub fn ensure(&self, descriptor: &AgentDescriptor) -> Result<Agent> {
        let capabilities = serde_json::to_string(&descriptor.capabilities)?;
        let now = now_millis();

        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO agents (id, name, category, capabilities, status, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, 'idle', ?5, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    category = excluded.category,
                    capabilities = excluded.capabilities,
                    updated_at = excluded.updated_at
                "#,
                params![
                    descriptor.agent_type,
                    descriptor.name,
                    descriptor.category.as_str(),
                    capabilities,
                    now
                ],
            )
        })?;

        debug!("Agent ensured: {}", descriptor.agent_type);
        self.get(&descriptor.agent_type)?
            .ok_or_else(|| OrchestratorError::NotFound(descriptor.agent_type.clone()))
    }

    /// Get an agent by id
    pub fn get(&self, id: &str) -> Result<Option<Agent>> {
        self.db.with_conn(|conn| get_agent(conn, id))
    }

    /// List agents, optionally filtered by status and category
    pub fn list(&self, filter: &AgentFilter) -> Result<Vec<Agent>> {
        let status = filter.status.map(|s| s.as_str());
        let category = filter.category.map(|c| c.as_str());

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM agents
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR category = ?2)
                 ORDER BY id",
                AGENT_COLUMNS
            ))?;
            let agents = stmt
                .query_map(params![status, category], agent_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(agents)
        })
    }

    /// Operator status change (e.g. maintenance). Soft only.
    pub fn set_status(&self, id: &str, status: AgentStatus) -> Result<Agent> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE agents SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), now_millis()],
            )
        })?;
        if updated == 0 {
            return Err(OrchestratorError::NotFound(format!("agent {}", id)));
        }

        info!("Agent {} status -> {}", id, status);
        self.get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(format!("agent {}", id)))
    }

    /// Mark an agent as running `task`. Returns false when the agent is
    /// missing or in maintenance, in which case nothing was counted.
    pub fn begin(&self, id: &str, task: &str) -> Result<bool> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE agents SET
                    status = 'active',
                    current_task = ?2,
                    active_executions = active_executions + 1,
                    updated_at = ?3
                 WHERE id = ?1 AND status != 'maintenance'",
                params![id, task, now_millis()],
            )
        })?;
        Ok(updated > 0)
    }

    /// Drop one in-flight execution without counting it. Used when the
    /// outcome could not be recorded.
    pub fn release(&self, id: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE agents SET
                    active_executions = MAX(active_executions - 1, 0),
                    current_task = CASE WHEN active_executions > 1 THEN current_task ELSE NULL END,
                    status = CASE
                        WHEN status = 'maintenance' THEN status
                        WHEN active_executions > 1 THEN 'active'
                        ELSE 'error'
                    END,
                    updated_at = ?2
                WHERE id = ?1
                "#,
                params![id, now_millis()],
            )
        })?;
        Ok(())
    }

    /// Clear in-flight markers left by a previous process
    pub fn reset_in_flight(&self) -> Result<usize> {
        let reset = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE agents SET
                    active_executions = 0,
                    current_task = NULL,
                    status = CASE WHEN status = 'active' THEN 'idle' ELSE status END,
                    updated_at = ?1
                 WHERE active_executions > 0 OR status = 'active'",
                params![now_millis()],
            )
        })?;
        if reset > 0 {
            warn!("Reset {} agents left active by an interrupted run", reset);
        }
        Ok(reset)
    }
}

pub(crate) fn get_agent(conn: &Connection, id: &str) -> rusqlite::Result<Option<Agent>> {
    conn.query_row(
        &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
        params![id],
        agent_from_row,
    )
    .optional()
}

/// Count one finished execution against an agent.
///
/// Runs inside the executor's completion transaction. The success rate is
/// recomputed from the integer counters, never accumulated. `began` says
/// whether the execution went through [`AgentDirectory::begin`]; the agent
/// stays active while other executions are still in flight.
pub(crate) fn record_execution(
    conn: &Connection,
    id: &str,
    success: bool,
    began: bool,
) -> rusqlite::Result<bool> {
    let counters: Option<(i64, i64)> = conn
        .query_row(
            "SELECT total_operations, successful_operations FROM agents WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((total, successful)) = counters else {
        return Ok(false);
    };

    let total = total as u64 + 1;
    let successful = successful as u64 + u64::from(success);
    let next_status = if success { "idle" } else { "error" };

    conn.execute(
        r#"
        UPDATE agents SET
            total_operations = ?2,
            successful_operations = ?3,
            success_rate = ?4,
            active_executions = MAX(active_executions - ?7, 0),
            current_task = CASE WHEN active_executions - ?7 > 0 THEN current_task ELSE NULL END,
            status = CASE
                WHEN status = 'maintenance' THEN status
                WHEN active_executions - ?7 > 0 THEN 'active'
                ELSE ?5
            END,
            updated_at = ?6
        WHERE id = ?1
        "#,
        params![
            id,
            total as i64,
            successful as i64,
            success_rate(successful, total),
            next_status,
            now_millis(),
            i64::from(began)
        ],
    )?;
    Ok(true)
}
