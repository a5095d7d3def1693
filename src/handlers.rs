//! Built-in Handlers
//!
//! Pluggable strategies registered for the catalog agents. Real business logic
//! replaces these behind the same [`Handler`] interface without touching the
//! router or executor.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use crate::agent::AgentDescriptor;
use crate::catalog::CATALOG;
use crate::memory::MemoryStore;
use crate::registry::{Handler, HandlerError, HandlerRegistry, HandlerResult, TaskContext};

/// Memory type under which risk profiles are cached
pub const RISK_PROFILE_MEMORY: &str = "risk_profile";

/// Agents served by [`RiskProfileHandler`]
pub const RISK_AGENTS: &[&str] = &["security", "security_lab"];

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0x[0-9a-fA-F]{6,64}\b").expect("valid address regex"));

/// Deterministic risk score in 0..=100 for an address
pub fn risk_score(address: &str) -> u8 {
    let digest = Sha256::digest(address.to_lowercase().as_bytes());
    (u16::from_be_bytes([digest[0], digest[1]]) % 101) as u8
}

fn risk_level(score: u8) -> &'static str {
    match score {
        0..=29 => "low",
        30..=69 => "medium",
        _ => "high",
    }
}

/// Address-like token from the task text, or the `address` context value
fn find_address(task: &str, ctx: &TaskContext) -> Option<String> {
    ADDRESS_PATTERN
        .find(task)
        .map(|m| m.as_str().to_lowercase())
        .or_else(|| ctx.get_str("address").map(|a| a.to_lowercase()))
}

/// Computes and caches a simulated risk profile per address
pub struct RiskProfileHandler {
    owner: String,
    memory: MemoryStore,
}

impl RiskProfileHandler {
    pub fn new(owner: &str, memory: MemoryStore) -> Self {
        Self {
            owner: owner.to_string(),
            memory,
        }
    }
}

#[async_trait]
impl Handler for RiskProfileHandler {
    async fn handle(&self, task: &str, ctx: &TaskContext) -> HandlerResult {
        let address = find_address(task, ctx)
            .ok_or_else(|| HandlerError::new("no address found in task"))?;

        if let Some(record) = self.memory.get(&self.owner, RISK_PROFILE_MEMORY, &address)? {
            debug!("Risk profile cache hit: {}", address);
            let mut profile = record.memory_value;
            profile["cached"] = json!(true);
            return Ok(profile);
        }

        let score = risk_score(&address);
        let digest = hex::encode(Sha256::digest(address.as_bytes()));
        let profile = json!({
            "address": address,
            "risk_score": score,
            "risk_level": risk_level(score),
            "fingerprint": &digest[..16],
        });

        // Riskier addresses are worth keeping longer
        let importance = f64::from(score) / 100.0;
        self.memory
            .upsert(&self.owner, RISK_PROFILE_MEMORY, &address, &profile, importance)?;

        let mut out = profile;
        out["cached"] = json!(false);
        Ok(out)
    }
}

/// Acknowledges a task on behalf of a catalog agent
pub struct CatalogHandler {
    descriptor: AgentDescriptor,
}

impl CatalogHandler {
    pub fn new(descriptor: AgentDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl Handler for CatalogHandler {
    async fn handle(&self, task: &str, ctx: &TaskContext) -> HandlerResult {
        Ok(json!({
            "agent": self.descriptor.agent_type,
            "name": self.descriptor.name,
            "category": self.descriptor.category,
            "capabilities": self.descriptor.capabilities,
            "task": task,
            "context": Value::Object(ctx.values.clone().into_iter().collect()),
            "status": "accepted",
        }))
    }
}

/// Register a handler for every catalog agent
pub fn register_builtin(registry: &mut HandlerRegistry, memory: &MemoryStore) {
    for entry in CATALOG {
        let descriptor = entry.descriptor();
        let handler: Arc<dyn Handler> = if RISK_AGENTS.contains(&entry.agent_type) {
            Arc::new(RiskProfileHandler::new(entry.agent_type, memory.clone()))
        } else {
            Arc::new(CatalogHandler::new(descriptor.clone()))
        };
        registry.register(descriptor, handler);
    }
}
