//! Executor
//!
//! Invokes a registered handler under a wall-clock budget and records the
//! outcome. Unknown agents, handler errors, panics and timeouts all come back
//! as a structured [`ExecutionResult`]; only persistence failures are returned
//! as errors.
//!
//! Every call writes exactly one log entry. The log entry, the agent counters
//! and the skill update are committed in one transaction.
//!
//! Each execution runs as its own tokio task, so it reaches a recorded end
//! even if the caller stops waiting. The handler runs in a nested task that
//! is aborted when the budget runs out or when the caller drops `execute`; an
//! aborted handler is cancelled at its next await point and its result is
//! never observed.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agent::{self, AgentDirectory, AgentStatus};
use crate::error::{OrchestratorError, Result};
use crate::log::{self, ExecutionLogEntry, ExecutionStatus};
use crate::registry::{Handler, HandlerRegistry, TaskContext};
use crate::skills;
use crate::storage::{now_millis, Database};

/// Max characters kept from a task description in the log
pub const INPUT_SUMMARY_CHARS: usize = 200;

/// Max characters kept from an error message
pub const ERROR_SUMMARY_CHARS: usize = 500;

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Wall-clock budget per handler invocation
    pub timeout: Duration,
    /// XP credited to the skill on success
    pub xp_per_success: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            xp_per_success: 10,
        }
    }
}

/// Why an execution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownAgent,
    HandlerError,
    AgentUnavailable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownAgent => "UnknownAgent",
            Self::HandlerError => "HandlerError",
            Self::AgentUnavailable => "AgentUnavailable",
        }
    }
}

/// Result of one handler invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Ok(Value),
    Failed(FailureKind, String),
    TimedOut,
}

/// What `execute` returns
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub agent_type: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub created_at: i64,
}

impl ExecutionResult {
    pub fn status(&self) -> ExecutionStatus {
        match self.outcome {
            Outcome::Ok(_) => ExecutionStatus::Success,
            Outcome::Failed(..) => ExecutionStatus::Failed,
            Outcome::TimedOut => ExecutionStatus::Timeout,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Ok(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Error text, prefixed by its kind (e.g. `UnknownAgent: ...`)
    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Ok(_) => None,
            Outcome::Failed(kind, message) => Some(format!("{}: {}", kind.as_str(), message)),
            Outcome::TimedOut => Some(format!("Timeout: no result after {}ms", self.duration_ms)),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            Outcome::Failed(kind, _) => Some(*kind),
            _ => None,
        }
    }

    /// The handler's value, or the failure as an error
    pub fn into_result(self) -> Result<Value> {
        match self.outcome {
            Outcome::Ok(value) => Ok(value),
            Outcome::TimedOut => Err(OrchestratorError::Timeout {
                agent_type: self.agent_type,
                after_ms: self.duration_ms,
            }),
            Outcome::Failed(FailureKind::UnknownAgent, _) => {
                Err(OrchestratorError::UnknownAgent(self.agent_type))
            }
            Outcome::Failed(FailureKind::AgentUnavailable, _) => {
                Err(OrchestratorError::AgentUnavailable {
                    agent_type: self.agent_type,
                    status: AgentStatus::Maintenance.to_string(),
                })
            }
            Outcome::Failed(FailureKind::HandlerError, message) => {
                Err(OrchestratorError::Handler(message))
            }
        }
    }
}

/// One entry of a batch
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub agent_type: String,
    pub task: String,
    pub context: TaskContext,
}

impl ExecutionRequest {
    pub fn new(agent_type: &str, task: &str) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            task: task.to_string(),
            context: TaskContext::default(),
        }
    }

    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = context;
        self
    }
}

/// Truncate to at most `max` characters
pub(crate) fn summarize(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Handler executor. Cheap to clone; clones share one registry and store.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    registry: Arc<HandlerRegistry>,
    agents: AgentDirectory,
    db: Arc<Database>,
    config: ExecutorConfig,
}

impl Executor {
    /// Build an executor, creating an agent record for every registered handler
    pub fn new(registry: Arc<HandlerRegistry>, db: Arc<Database>, config: ExecutorConfig) -> Result<Self> {
        let agents = AgentDirectory::new(Arc::clone(&db));
        agents.reset_in_flight()?;
        for descriptor in registry.descriptors() {
            agents.ensure(descriptor)?;
        }
        info!(
            "Executor ready: {} agents, timeout {:?}",
            registry.len(),
            config.timeout
        );

        Ok(Self {
            inner: Arc::new(ExecutorInner {
                registry,
                agents,
                db,
                config,
            }),
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    pub fn agents(&self) -> &AgentDirectory {
        &self.inner.agents
    }

    /// Run one task on one agent type.
    ///
    /// Dropping the returned future aborts the handler; the execution is
    /// still logged, as a cancelled handler failure.
    pub async fn execute(
        &self,
        agent_type: &str,
        task: &str,
        ctx: TaskContext,
    ) -> Result<ExecutionResult> {
        // Dropped with this future, which tells the execution to stop
        let (caller_alive, caller_gone) = oneshot::channel::<()>();

        let inner = Arc::clone(&self.inner);
        let agent_type = agent_type.to_string();
        let task = task.to_string();
        let unit = tokio::spawn(async move { inner.run(&agent_type, &task, ctx, caller_gone).await });

        let joined = unit.await;
        drop(caller_alive);
        match joined {
            Ok(result) => result,
            Err(e) => {
                error!("Execution task failed: {}", e);
                Err(OrchestratorError::Interrupted(e.to_string()))
            }
        }
    }

    /// Run independent executions concurrently. Results keep request order.
    pub async fn execute_batch(&self, requests: Vec<ExecutionRequest>) -> Vec<Result<ExecutionResult>> {
        let futures = requests
            .into_iter()
            .map(|req| async move { self.execute(&req.agent_type, &req.task, req.context).await });
        join_all(futures).await
    }
}

impl ExecutorInner {
    async fn run(
        &self,
        agent_type: &str,
        task: &str,
        ctx: TaskContext,
        caller_gone: oneshot::Receiver<()>,
    ) -> Result<ExecutionResult> {
        let execution_id = Uuid::new_v4().to_string();
        let created_at = now_millis();
        let started = Instant::now();
        let input_summary = summarize(task, INPUT_SUMMARY_CHARS);

        let (outcome, began) = match self.registry.lookup(agent_type) {
            Err(e) => {
                warn!("Execution {}: {}", execution_id, e);
                (Outcome::Failed(FailureKind::UnknownAgent, e.to_string()), false)
            }
            Ok(handler) => match self.agents.get(agent_type)? {
                Some(a) if !a.status.accepts_work() => {
                    let e = OrchestratorError::AgentUnavailable {
                        agent_type: agent_type.to_string(),
                        status: a.status.to_string(),
                    };
                    warn!("Execution {}: {}", execution_id, e);
                    (Outcome::Failed(FailureKind::AgentUnavailable, e.to_string()), false)
                }
                _ => {
                    let began = self.agents.begin(agent_type, &input_summary)?;
                    (
                        self.invoke(handler, agent_type, task, &ctx, caller_gone).await,
                        began,
                    )
                }
            },
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let result = ExecutionResult {
            execution_id,
            agent_type: agent_type.to_string(),
            outcome,
            duration_ms,
            created_at,
        };

        if let Err(e) = self.record(&result, &input_summary, &ctx, began) {
            error!(
                "Execution {} on {} could not be recorded: {}",
                result.execution_id, agent_type, e
            );
            if began {
                if let Err(release_err) = self.agents.release(agent_type) {
                    warn!("Failed to release agent {}: {}", agent_type, release_err);
                }
            }
            return Err(e);
        }

        match result.status() {
            ExecutionStatus::Success => info!(
                "Execution {} on {} succeeded in {}ms",
                result.execution_id, agent_type, duration_ms
            ),
            status => warn!(
                "Execution {} on {} {} in {}ms",
                result.execution_id, agent_type, status, duration_ms
            ),
        }
        Ok(result)
    }

    async fn invoke(
        &self,
        handler: Arc<dyn Handler>,
        agent_type: &str,
        task: &str,
        ctx: &TaskContext,
        caller_gone: oneshot::Receiver<()>,
    ) -> Outcome {
        let task = task.to_string();
        let ctx = ctx.clone();
        let mut handle = tokio::spawn(async move { handler.handle(&task, &ctx).await });

        let joined = tokio::select! {
            joined = tokio::time::timeout(self.config.timeout, &mut handle) => Some(joined),
            _ = caller_gone => None,
        };
        let Some(joined) = joined else {
            handle.abort();
            warn!("Caller dropped execution on {}, handler aborted", agent_type);
            return Outcome::Failed(
                FailureKind::HandlerError,
                "handler cancelled: caller stopped waiting".to_string(),
            );
        };

        match joined {
            Ok(Ok(Ok(value))) => Outcome::Ok(value),
            Ok(Ok(Err(e))) => Outcome::Failed(
                FailureKind::HandlerError,
                summarize(&e.to_string(), ERROR_SUMMARY_CHARS),
            ),
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    "handler panicked"
                } else {
                    "handler cancelled"
                };
                warn!("Handler for {}: {}", agent_type, message);
                Outcome::Failed(FailureKind::HandlerError, message.to_string())
            }
            Err(_) => {
                handle.abort();
                debug!("Aborted handler for {} after {:?}", agent_type, self.config.timeout);
                Outcome::TimedOut
            }
        }
    }

    // Log entry, agent counters and skill progress commit together
    fn record(
        &self,
        result: &ExecutionResult,
        input_summary: &str,
        ctx: &TaskContext,
        began: bool,
    ) -> Result<()> {
        let success = result.is_success();
        let entry = ExecutionLogEntry {
            execution_id: result.execution_id.clone(),
            agent_id: result.agent_type.clone(),
            action: "execute".to_string(),
            input_summary: input_summary.to_string(),
            status: result.status(),
            error: result.error().map(|e| summarize(&e, ERROR_SUMMARY_CHARS)),
            result: result.value().cloned(),
            duration_ms: result.duration_ms,
            created_at: result.created_at,
        };

        let agent_type = result.agent_type.as_str();
        let category = self
            .registry
            .descriptor(agent_type)
            .map(|d| d.category.as_str());
        let skill_name = ctx.skill.as_deref().unwrap_or(agent_type);
        let xp = ctx.xp.unwrap_or(self.config.xp_per_success);

        self.db.transaction(|tx| {
            log::append_in(tx, &entry)?;
            if let Some(category) = category {
                agent::record_execution(tx, agent_type, success, began)?;
                if began {
                    skills::record_in(tx, agent_type, skill_name, category, xp, success)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentCategory, AgentDescriptor, AgentStatus};
    use crate::log::ExecutionLog;
    use crate::registry::HandlerError;
    use crate::skills::SkillBook;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn descriptor(agent_type: &str) -> AgentDescriptor {
        AgentDescriptor::new(agent_type, agent_type, AgentCategory::Core)
    }

    struct Fixture {
        executor: Executor,
        db: Arc<Database>,
    }

    fn fixture(registry: HandlerRegistry, timeout: Duration) -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = ExecutorConfig {
            timeout,
            xp_per_success: 10,
        };
        let executor = Executor::new(Arc::new(registry), Arc::clone(&db), config).unwrap();
        Fixture { executor, db }
    }

    fn log_count(db: &Arc<Database>) -> i64 {
        db.with_conn(|c| c.query_row("SELECT COUNT(*) FROM execution_logs", [], |row| row.get(0)))
            .unwrap()
    }

    fn echo_registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register_fn(descriptor("echo"), |task, _ctx| async move {
            Ok(json!({ "echo": task }))
        });
        registry.register_fn(descriptor("broken"), |_task, _ctx| async move {
            Err(HandlerError::new("database offline"))
        });
        registry.register_fn(descriptor("panicky"), |_task, _ctx| async move {
            if true {
                panic!("boom");
            }
            Ok(Value::Null)
        });
        registry
    }

    #[tokio::test]
    async fn test_success_updates_everything() {
        let f = fixture(echo_registry(), Duration::from_secs(5));

        let result = f
            .executor
            .execute("echo", "hello", TaskContext::new())
            .await
            .unwrap();
        assert_eq!(result.status(), ExecutionStatus::Success);
        assert_eq!(result.value(), Some(&json!({ "echo": "hello" })));

        let agent = f.executor.agents().get("echo").unwrap().unwrap();
        assert_eq!(agent.total_operations, 1);
        assert_eq!(agent.success_rate, 1.0);
        assert_eq!(agent.status, AgentStatus::Idle);
        assert!(agent.current_task.is_none());

        let skill = SkillBook::new(Arc::clone(&f.db))
            .get("echo", "echo")
            .unwrap()
            .unwrap();
        assert_eq!(skill.experience_points, 10);

        let entries = ExecutionLog::new(Arc::clone(&f.db))
            .query("echo", 10, None)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].execution_id, result.execution_id);
    }

    #[tokio::test]
    async fn test_unknown_agent_is_logged() {
        let f = fixture(echo_registry(), Duration::from_secs(5));

        let result = f
            .executor
            .execute("unregistered_type", "do thing", TaskContext::new())
            .await
            .unwrap();
        assert_eq!(result.status(), ExecutionStatus::Failed);
        assert_eq!(result.failure_kind(), Some(FailureKind::UnknownAgent));
        assert!(result.error().unwrap().starts_with("UnknownAgent"));

        let entries = ExecutionLog::new(Arc::clone(&f.db))
            .query("unregistered_type", 10, None)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_handler_error_is_captured() {
        let f = fixture(echo_registry(), Duration::from_secs(5));

        let result = f
            .executor
            .execute("broken", "x", TaskContext::new())
            .await
            .unwrap();
        assert_eq!(result.failure_kind(), Some(FailureKind::HandlerError));
        assert!(result.error().unwrap().contains("database offline"));

        let agent = f.executor.agents().get("broken").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Error);
        assert_eq!(agent.success_rate, 0.0);

        // Touched, no XP
        let skill = SkillBook::new(Arc::clone(&f.db))
            .get("broken", "broken")
            .unwrap()
            .unwrap();
        assert_eq!(skill.experience_points, 0);
        assert_eq!(log_count(&f.db), 1);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let f = fixture(echo_registry(), Duration::from_secs(5));

        let result = f
            .executor
            .execute("panicky", "x", TaskContext::new())
            .await
            .unwrap();
        assert_eq!(result.failure_kind(), Some(FailureKind::HandlerError));
        assert!(result.error().unwrap().contains("handler panicked"));
        assert_eq!(log_count(&f.db), 1);

        // Still usable afterwards
        let ok = f
            .executor
            .execute("echo", "after", TaskContext::new())
            .await
            .unwrap();
        assert!(ok.is_success());
    }

    #[tokio::test]
    async fn test_timeout_returns_at_deadline_and_aborts() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let mut registry = HandlerRegistry::new();
        registry.register_fn(descriptor("slow"), move |_task, _ctx| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
        });
        let f = fixture(registry, Duration::from_millis(50));

        let started = Instant::now();
        let result = f
            .executor
            .execute("slow", "x", TaskContext::new())
            .await
            .unwrap();
        assert_eq!(result.status(), ExecutionStatus::Timeout);
        assert!(started.elapsed() < Duration::from_millis(250));

        // Aborted: the handler never reaches its side effect
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));

        let agent = f.executor.agents().get("slow").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Error);
        assert_eq!(log_count(&f.db), 1);
    }

    #[tokio::test]
    async fn test_maintenance_agent_not_invoked() {
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&invoked);

        let mut registry = HandlerRegistry::new();
        registry.register_fn(descriptor("kyc"), move |_task, _ctx| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
        });
        let f = fixture(registry, Duration::from_secs(5));
        f.executor
            .agents()
            .set_status("kyc", AgentStatus::Maintenance)
            .unwrap();

        let result = f
            .executor
            .execute("kyc", "verify passport", TaskContext::new())
            .await
            .unwrap();
        assert_eq!(result.failure_kind(), Some(FailureKind::AgentUnavailable));
        assert!(!invoked.load(Ordering::SeqCst));

        let agent = f.executor.agents().get("kyc").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Maintenance);
        assert_eq!(agent.total_operations, 1);
        assert_eq!(log_count(&f.db), 1);
    }

    #[tokio::test]
    async fn test_context_overrides_skill_and_xp() {
        let f = fixture(echo_registry(), Duration::from_secs(5));
        let ctx = TaskContext::new().with_skill("greeting").with_xp(250);

        f.executor.execute("echo", "hi", ctx).await.unwrap();

        let skill = SkillBook::new(Arc::clone(&f.db))
            .get("echo", "greeting")
            .unwrap()
            .unwrap();
        assert_eq!(skill.experience_points, 250);
        assert_eq!(skill.level, 1);
        assert_eq!(skill.category, "core");
    }

    #[tokio::test]
    async fn test_batch_has_no_lost_updates() {
        let f = fixture(echo_registry(), Duration::from_secs(5));

        let mut requests: Vec<_> = (0..15)
            .map(|i| ExecutionRequest::new("echo", &format!("task {}", i)))
            .collect();
        requests.extend((0..5).map(|_| ExecutionRequest::new("broken", "x")));

        let results = f.executor.execute_batch(requests).await;
        assert_eq!(results.len(), 20);
        assert!(results.iter().all(|r| r.is_ok()));

        let echo = f.executor.agents().get("echo").unwrap().unwrap();
        assert_eq!(echo.total_operations, 15);
        assert_eq!(echo.successful_operations, 15);

        let broken = f.executor.agents().get("broken").unwrap().unwrap();
        assert_eq!(broken.total_operations, 5);
        assert_eq!(broken.successful_operations, 0);
        assert_eq!(log_count(&f.db), 20);
    }

    #[tokio::test]
    async fn test_dropped_execute_is_recorded_and_aborted() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let mut registry = HandlerRegistry::new();
        registry.register_fn(descriptor("slow"), move |_task, _ctx| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
        });
        let f = fixture(registry, Duration::from_secs(5));

        // The caller gives up long before the handler finishes
        let gave_up = tokio::time::timeout(
            Duration::from_millis(50),
            f.executor.execute("slow", "x", TaskContext::new()),
        )
        .await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));

        let entries = ExecutionLog::new(Arc::clone(&f.db))
            .query("slow", 10, None)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ExecutionStatus::Failed);
        assert!(entries[0].error.as_ref().unwrap().contains("cancelled"));

        let agent = f.executor.agents().get("slow").unwrap().unwrap();
        assert_ne!(agent.status, AgentStatus::Active);
        assert_eq!(agent.active_executions, 0);
        assert!(agent.current_task.is_none());
        assert_eq!(agent.total_operations, 1);
    }

    #[tokio::test]
    async fn test_agent_stays_active_while_runs_overlap() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn(descriptor("worker"), |task, _ctx| async move {
            let pause = if task == "slow" { 300 } else { 10 };
            tokio::time::sleep(Duration::from_millis(pause)).await;
            Ok(json!({ "done": task }))
        });
        let f = fixture(registry, Duration::from_secs(5));

        let executor = f.executor.clone();
        let slow = tokio::spawn(async move {
            executor.execute("worker", "slow", TaskContext::new()).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let fast = f
            .executor
            .execute("worker", "fast", TaskContext::new())
            .await
            .unwrap();
        assert!(fast.is_success());

        let agent = f.executor.agents().get("worker").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(agent.active_executions, 1);
        assert!(agent.current_task.is_some());

        assert!(slow.await.unwrap().unwrap().is_success());
        let agent = f.executor.agents().get("worker").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.active_executions, 0);
        assert!(agent.current_task.is_none());
        assert_eq!(agent.total_operations, 2);
    }

    #[tokio::test]
    async fn test_log_write_failure_leaves_no_partial_update() {
        let f = fixture(echo_registry(), Duration::from_secs(5));
        f.db.fail_inserts_into("execution_logs");

        let err = f
            .executor
            .execute("echo", "hello", TaskContext::new())
            .await
            .unwrap_err();
        assert!(err.is_persistence());

        assert_eq!(log_count(&f.db), 0);
        let skills: i64 = f
            .db
            .with_conn(|c| c.query_row("SELECT COUNT(*) FROM skills", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(skills, 0);

        let agent = f.executor.agents().get("echo").unwrap().unwrap();
        assert_eq!(agent.total_operations, 0);
        assert_eq!(agent.successful_operations, 0);
        assert_eq!(agent.active_executions, 0);
        assert!(agent.current_task.is_none());
        assert_ne!(agent.status, AgentStatus::Active);
    }

    #[tokio::test]
    async fn test_into_result_maps_failures() {
        let mut registry = echo_registry();
        registry.register_fn(descriptor("stuck"), |_task, _ctx| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        });
        let f = fixture(registry, Duration::from_millis(50));

        let ok = f.executor.execute("echo", "hi", TaskContext::new()).await.unwrap();
        assert_eq!(ok.into_result().unwrap(), json!({ "echo": "hi" }));

        let broken = f.executor.execute("broken", "x", TaskContext::new()).await.unwrap();
        assert!(matches!(
            broken.into_result(),
            Err(OrchestratorError::Handler(ref m)) if m.contains("database offline")
        ));

        let stuck = f.executor.execute("stuck", "x", TaskContext::new()).await.unwrap();
        assert!(matches!(
            stuck.into_result(),
            Err(OrchestratorError::Timeout { ref agent_type, .. }) if agent_type == "stuck"
        ));

        let missing = f.executor.execute("ghost", "x", TaskContext::new()).await.unwrap();
        assert!(matches!(missing.into_result(), Err(OrchestratorError::UnknownAgent(_))));

        f.executor
            .agents()
            .set_status("echo", AgentStatus::Maintenance)
            .unwrap();
        let parked = f.executor.execute("echo", "x", TaskContext::new()).await.unwrap();
        assert!(matches!(
            parked.into_result(),
            Err(OrchestratorError::AgentUnavailable { .. })
        ));
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("short", 10), "short");
        let long = "x".repeat(600);
        let s = summarize(&long, ERROR_SUMMARY_CHARS);
        assert_eq!(s.chars().count(), ERROR_SUMMARY_CHARS);
        assert!(s.ends_with("..."));
    }
}
