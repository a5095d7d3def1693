//! SQLite Storage
//!
//! One connection shared by every store. Agents, execution logs, skills,
//! memories and tasks live in the same database so the executor can record
//! an execution's log entry, agent counters and skill progress in a single
//! transaction.

use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Shared SQLite database
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self::from_connection(conn)?;

        info!("Database opened: {}", path.display());
        Ok(db)
    }

    /// In-memory database (tests, one-shot runs)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read or single-statement write against the connection
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        Ok(f(&conn)?)
    }

    /// Run `f` inside one transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS agents (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            capabilities TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'idle'
                CHECK(status IN ('active', 'idle', 'error', 'maintenance')),
            total_operations INTEGER NOT NULL DEFAULT 0,
            successful_operations INTEGER NOT NULL DEFAULT 0,
            success_rate REAL NOT NULL DEFAULT 0.0,
            active_executions INTEGER NOT NULL DEFAULT 0,
            current_task TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_agents_category ON agents(category);
        CREATE INDEX IF NOT EXISTS idx_agents_status ON agents(status);

        CREATE TABLE IF NOT EXISTS execution_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            execution_id TEXT NOT NULL UNIQUE,
            agent_id TEXT NOT NULL,
            action TEXT NOT NULL,
            input_summary TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('success', 'failed', 'timeout')),
            error TEXT,
            result TEXT,
            duration_ms INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_execution_logs_agent
            ON execution_logs(agent_id, id DESC);
        CREATE INDEX IF NOT EXISTS idx_execution_logs_created
            ON execution_logs(created_at);

        CREATE TABLE IF NOT EXISTS skills (
            agent_id TEXT NOT NULL,
            skill_name TEXT NOT NULL,
            category TEXT NOT NULL,
            level INTEGER NOT NULL DEFAULT 0,
            experience_points INTEGER NOT NULL DEFAULT 0,
            last_used_at INTEGER NOT NULL,
            PRIMARY KEY (agent_id, skill_name)
        );

        CREATE TABLE IF NOT EXISTS memories (
            owner_id TEXT NOT NULL,
            memory_type TEXT NOT NULL,
            memory_key TEXT NOT NULL,
            memory_value TEXT NOT NULL,
            importance REAL NOT NULL DEFAULT 0.5,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (owner_id, memory_type, memory_key)
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            status TEXT NOT NULL
                CHECK(status IN ('pending', 'in_progress', 'completed', 'failed')),
            priority INTEGER NOT NULL DEFAULT 5,
            completion_percentage INTEGER NOT NULL DEFAULT 0,
            files_touched TEXT NOT NULL DEFAULT '[]',
            agent_type TEXT,
            session_id TEXT,
            result TEXT,
            error TEXT,
            started_at INTEGER,
            execution_time_ms INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_session ON tasks(session_id);
        "#,
    )
}

#[cfg(test)]
impl Database {
    /// Make every insert into `table` fail, as a full or broken disk would
    pub(crate) fn fail_inserts_into(&self, table: &str) {
        self.with_conn(|c| {
            c.execute_batch(&format!(
                "CREATE TRIGGER fail_{table}_insert BEFORE INSERT ON {table}
                 BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;"
            ))
        })
        .unwrap();
    }
}

/// Current time in unix milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
