//! Handler Registry
//!
//! Maps agent-type keys to invocable handlers. Built once at startup, then
//! shared read-only (behind `Arc`) by the router and the executor.
//!
//! Handlers are third-party code of varying quality: anything that implements
//! [`Handler`] (or any async closure wrapped in [`FnHandler`]) can be
//! registered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::AgentDescriptor;
use crate::error::{OrchestratorError, Result};

/// Error returned by a handler
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<OrchestratorError> for HandlerError {
    fn from(e: OrchestratorError) -> Self {
        Self(e.to_string())
    }
}

/// What a handler produces
pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// Per-invocation context passed to handlers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    /// Free-form values supplied by the caller
    #[serde(default)]
    pub values: HashMap<String, Value>,
    /// Skill credited on success (defaults to the agent type)
    #[serde(default)]
    pub skill: Option<String>,
    /// Experience awarded on success (defaults to the configured amount)
    #[serde(default)]
    pub xp: Option<u64>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn with_skill(mut self, skill: &str) -> Self {
        self.skill = Some(skill.to_string());
        self
    }

    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = Some(xp);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }
}

/// The work an agent performs
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, task: &str, ctx: &TaskContext) -> HandlerResult;
}

type BoxedHandlerFn = Arc<
    dyn Fn(String, TaskContext) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>>
        + Send
        + Sync,
>;

/// Adapts an async closure into a [`Handler`]
pub struct FnHandler {
    f: BoxedHandlerFn,
}

impl FnHandler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(String, TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            f: Arc::new(move |task, ctx| Box::pin(f(task, ctx))),
        }
    }
}

#[async_trait]
impl Handler for FnHandler {
    async fn handle(&self, task: &str, ctx: &TaskContext) -> HandlerResult {
        (self.f)(task.to_string(), ctx.clone()).await
    }
}

/// A registered handler with its agent description
#[derive(Clone)]
pub struct RegisteredAgent {
    pub descriptor: AgentDescriptor,
    pub handler: Arc<dyn Handler>,
}

/// Agent-type key -> handler
#[derive(Default)]
pub struct HandlerRegistry {
    agents: HashMap<String, RegisteredAgent>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A second registration for the same key replaces
    /// the first.
    pub fn register(&mut self, descriptor: AgentDescriptor, handler: Arc<dyn Handler>) {
        let key = descriptor.agent_type.clone();
        if self.agents.contains_key(&key) {
            debug!("Replacing handler for {}", key);
        } else {
            info!("Registered agent: {} ({})", key, descriptor.category);
        }
        self.agents.insert(
            key,
            RegisteredAgent {
                descriptor,
                handler,
            },
        );
    }

    /// Register an async closure
    pub fn register_fn<F, Fut>(&mut self, descriptor: AgentDescriptor, f: F)
    where
        F: Fn(String, TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(descriptor, Arc::new(FnHandler::new(f)));
    }

    /// Find the handler for an agent type
    pub fn lookup(&self, agent_type: &str) -> Result<Arc<dyn Handler>> {
        self.agents
            .get(agent_type)
            .map(|a| Arc::clone(&a.handler))
            .ok_or_else(|| OrchestratorError::UnknownAgent(agent_type.to_string()))
    }

    pub fn get(&self, agent_type: &str) -> Option<&RegisteredAgent> {
        self.agents.get(agent_type)
    }

    pub fn descriptor(&self, agent_type: &str) -> Option<&AgentDescriptor> {
        self.agents.get(agent_type).map(|a| &a.descriptor)
    }

    pub fn contains(&self, agent_type: &str) -> bool {
        self.agents.contains_key(agent_type)
    }

    /// All registered agent types, sorted
    pub fn agent_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.agents.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.values().map(|a| &a.descriptor)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentCategory;
    use serde_json::json;

    fn descriptor(agent_type: &str) -> AgentDescriptor {
        AgentDescriptor::new(agent_type, agent_type, AgentCategory::Core)
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn(descriptor("echo"), |task, _ctx| async move {
            Ok(json!({ "echo": task }))
        });

        let handler = registry.lookup("echo").unwrap();
        let out = handler.handle("hello", &TaskContext::new()).await.unwrap();
        assert_eq!(out["echo"], "hello");
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = HandlerRegistry::new();
        let err = registry.lookup("missing").err().unwrap();
        assert!(matches!(err, OrchestratorError::UnknownAgent(ref t) if t == "missing"));
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn(descriptor("dup"), |_t, _c| async { Ok(json!(1)) });
        registry.register_fn(descriptor("dup"), |_t, _c| async { Ok(json!(2)) });

        assert_eq!(registry.len(), 1);
        let out = registry
            .lookup("dup")
            .unwrap()
            .handle("x", &TaskContext::new())
            .await
            .unwrap();
        assert_eq!(out, json!(2));
    }

    #[test]
    fn test_fn_handler_error() {
        let handler = FnHandler::new(|_task, _ctx| async { Err(HandlerError::new("no quote")) });
        let err = tokio_test::block_on(handler.handle("x", &TaskContext::new())).unwrap_err();
        assert_eq!(err, HandlerError::new("no quote"));
        assert_eq!(err.to_string(), "no quote");
    }

    #[test]
    fn test_agent_types_sorted() {
        let mut registry = HandlerRegistry::new();
        for t in ["wallet", "analytics", "kyc"] {
            registry.register_fn(descriptor(t), |_t, _c| async { Ok(Value::Null) });
        }
        assert_eq!(registry.agent_types(), vec!["analytics", "kyc", "wallet"]);
    }

    #[test]
    fn test_context_builder() {
        let ctx = TaskContext::new()
            .with_value("address", json!("0xabc"))
            .with_skill("risk_scoring")
            .with_xp(25);

        assert_eq!(ctx.get_str("address"), Some("0xabc"));
        assert_eq!(ctx.skill.as_deref(), Some("risk_scoring"));
        assert_eq!(ctx.xp, Some(25));
    }
}
