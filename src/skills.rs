//! Progress and Skill Accounting
//!
//! Per-agent named skills with experience points and a level derived from a
//! fixed threshold table. XP only moves on success; `last_used_at` moves on
//! every attempt.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::storage::{now_millis, Database};

/// XP needed to reach each level index
pub const LEVEL_THRESHOLDS: [u64; 10] = [100, 250, 500, 1000, 2000, 4000, 8000, 16000, 32000, 64000];

/// Step between thresholds past the end of the table
pub const LEVEL_STEP_BEYOND_TABLE: u64 = 100_000;

/// Threshold for level index `i`, extending the table by a constant step
pub fn threshold(i: u32) -> u64 {
    let last = LEVEL_THRESHOLDS.len() - 1;
    match LEVEL_THRESHOLDS.get(i as usize) {
        Some(t) => *t,
        None => LEVEL_THRESHOLDS[last]
            .saturating_add(LEVEL_STEP_BEYOND_TABLE.saturating_mul(u64::from(i) - last as u64)),
    }
}

/// Highest level whose threshold does not exceed `xp` (0 below the first)
pub fn level_for_xp(xp: u64) -> u32 {
    let last = LEVEL_THRESHOLDS.len() - 1;
    let top = LEVEL_THRESHOLDS[last];
    if xp >= top {
        return last as u32 + ((xp - top) / LEVEL_STEP_BEYOND_TABLE) as u32;
    }
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|t| *t <= xp)
        .map(|i| i as u32)
        .unwrap_or(0)
}

/// XP still missing before the next level
pub fn xp_to_next_level(xp: u64) -> u64 {
    threshold(level_for_xp(xp) + 1).saturating_sub(xp)
}

/// A skill record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub agent_id: String,
    pub skill_name: String,
    pub category: String,
    pub level: u32,
    pub experience_points: u64,
    pub last_used_at: i64,
}

impl Skill {
    pub fn xp_to_next_level(&self) -> u64 {
        xp_to_next_level(self.experience_points)
    }
}

fn skill_from_row(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        agent_id: row.get(0)?,
        skill_name: row.get(1)?,
        category: row.get(2)?,
        level: row.get(3)?,
        experience_points: row.get::<_, i64>(4)? as u64,
        last_used_at: row.get(5)?,
    })
}

const SKILL_COLUMNS: &str = "agent_id, skill_name, category, level, experience_points, last_used_at";

/// Skill store backed by the shared database
#[derive(Clone)]
pub struct SkillBook {
    db: Arc<Database>,
}

impl SkillBook {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record one attempt against a skill
    pub fn record_outcome(
        &self,
        agent_id: &str,
        skill_name: &str,
        category: &str,
        xp_delta: u64,
        success: bool,
    ) -> Result<Skill> {
        let skill = self
            .db
            .transaction(|tx| record_in(tx, agent_id, skill_name, category, xp_delta, success))?;
        debug!(
            "Skill {}/{}: {} XP, level {}",
            agent_id, skill_name, skill.experience_points, skill.level
        );
        Ok(skill)
    }

    pub fn get(&self, agent_id: &str, skill_name: &str) -> Result<Option<Skill>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM skills WHERE agent_id = ?1 AND skill_name = ?2",
                    SKILL_COLUMNS
                ),
                params![agent_id, skill_name],
                skill_from_row,
            )
            .optional()
        })
    }

    /// All skills of an agent, most experienced first
    pub fn list(&self, agent_id: &str) -> Result<Vec<Skill>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM skills WHERE agent_id = ?1
                 ORDER BY experience_points DESC, skill_name",
                SKILL_COLUMNS
            ))?;
            let skills = stmt
                .query_map(params![agent_id], skill_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(skills)
        })
    }

    /// Explicit reset to 0 XP, level 0. Returns false if the skill is unknown.
    pub fn reset(&self, agent_id: &str, skill_name: &str) -> Result<bool> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE skills SET experience_points = 0, level = 0
                 WHERE agent_id = ?1 AND skill_name = ?2",
                params![agent_id, skill_name],
            )
        })?;
        if updated > 0 {
            info!("Skill reset: {}/{}", agent_id, skill_name);
        }
        Ok(updated > 0)
    }
}

/// Apply one attempt inside an open transaction.
///
/// Creates the skill at 0 XP if absent. Level is recomputed from the
/// cumulative total, never incremented.
pub(crate) fn record_in(
    conn: &Connection,
    agent_id: &str,
    skill_name: &str,
    category: &str,
    xp_delta: u64,
    success: bool,
) -> rusqlite::Result<Skill> {
    let current: Option<i64> = conn
        .query_row(
            "SELECT experience_points FROM skills WHERE agent_id = ?1 AND skill_name = ?2",
            params![agent_id, skill_name],
            |row| row.get(0),
        )
        .optional()?;

    let xp = current.unwrap_or(0) as u64;
    let xp = if success { xp.saturating_add(xp_delta) } else { xp };
    // SQLite integers are signed
    let xp = xp.min(i64::MAX as u64);
    let level = level_for_xp(xp);
    let now = now_millis();

    conn.execute(
        r#"
        INSERT INTO skills (agent_id, skill_name, category, level, experience_points, last_used_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(agent_id, skill_name) DO UPDATE SET
            level = excluded.level,
            experience_points = excluded.experience_points,
            last_used_at = excluded.last_used_at
        "#,
        params![agent_id, skill_name, category, level, xp as i64, now],
    )?;

    Ok(Skill {
        agent_id: agent_id.to_string(),
        skill_name: skill_name.to_string(),
        category: category.to_string(),
        level,
        experience_points: xp,
        last_used_at: now,
    })
}
