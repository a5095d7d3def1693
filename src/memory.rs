//! Memory Store
//!
//! Key/value records scoped by (owner, type, key), used by handlers as a
//! result cache. Writes are upserts; there is no expiry. `importance` is an
//! opaque weight handlers may use for their own eviction via `prune`.

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::storage::{now_millis, Database};

/// Default importance for new records
pub const DEFAULT_IMPORTANCE: f64 = 0.5;

/// Memory record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub owner_id: String,
    pub memory_type: String,
    pub memory_key: String,
    pub memory_value: Value,
    pub importance: f64,
    pub updated_at: i64,
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let value: String = row.get(3)?;
    Ok(MemoryRecord {
        owner_id: row.get(0)?,
        memory_type: row.get(1)?,
        memory_key: row.get(2)?,
        memory_value: serde_json::from_str(&value).unwrap_or(Value::Null),
        importance: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const MEMORY_COLUMNS: &str = "owner_id, memory_type, memory_key, memory_value, importance, updated_at";

/// Memory store backed by the shared database
#[derive(Clone)]
pub struct MemoryStore {
    db: Arc<Database>,
}

impl MemoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or overwrite a record; bumps `updated_at`
    pub fn upsert(
        &self,
        owner_id: &str,
        memory_type: &str,
        memory_key: &str,
        value: &Value,
        importance: f64,
    ) -> Result<MemoryRecord> {
        let encoded = serde_json::to_string(value)?;
        let now = now_millis();

        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO memories (owner_id, memory_type, memory_key, memory_value, importance, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(owner_id, memory_type, memory_key) DO UPDATE SET
                    memory_value = excluded.memory_value,
                    importance = excluded.importance,
                    updated_at = excluded.updated_at
                "#,
                params![owner_id, memory_type, memory_key, encoded, importance, now],
            )
        })?;

        debug!("Memory upserted: {}/{}/{}", owner_id, memory_type, memory_key);
        Ok(MemoryRecord {
            owner_id: owner_id.to_string(),
            memory_type: memory_type.to_string(),
            memory_key: memory_key.to_string(),
            memory_value: value.clone(),
            importance,
            updated_at: now,
        })
    }

    pub fn get(
        &self,
        owner_id: &str,
        memory_type: &str,
        memory_key: &str,
    ) -> Result<Option<MemoryRecord>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM memories
                     WHERE owner_id = ?1 AND memory_type = ?2 AND memory_key = ?3",
                    MEMORY_COLUMNS
                ),
                params![owner_id, memory_type, memory_key],
                record_from_row,
            )
            .optional()
        })
    }

    /// All records of one type, most important first
    pub fn list_by_type(&self, owner_id: &str, memory_type: &str) -> Result<Vec<MemoryRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM memories
                 WHERE owner_id = ?1 AND memory_type = ?2
                 ORDER BY importance DESC, memory_key",
                MEMORY_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![owner_id, memory_type], record_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    /// Delete one record. Returns whether it existed.
    pub fn forget(&self, owner_id: &str, memory_type: &str, memory_key: &str) -> Result<bool> {
        let removed = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM memories WHERE owner_id = ?1 AND memory_type = ?2 AND memory_key = ?3",
                params![owner_id, memory_type, memory_key],
            )
        })?;
        Ok(removed > 0)
    }

    /// Drop an owner's records below an importance weight
    pub fn prune(&self, owner_id: &str, below_importance: f64) -> Result<usize> {
        let removed = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM memories WHERE owner_id = ?1 AND importance < ?2",
                params![owner_id, below_importance],
            )
        })?;
        info!("Pruned {} memories for {}", removed, owner_id);
        Ok(removed)
    }
}
