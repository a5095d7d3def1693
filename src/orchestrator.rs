//! Orchestrator
//!
//! Ties the pieces together for inbound submissions: track the task, route
//! it, execute it, and answer with the outcome plus the agent's recent log.
//! Also the read-only query surface used by the HTTP API and the CLI.
//!
//! A started submission always leaves its task completed or failed, even when
//! the caller stops waiting or the store rejects a write along the way.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::agent::{Agent, AgentDirectory, AgentFilter, AgentStatus};
use crate::config::Config;
use crate::error::{OrchestratorError, Result};
use crate::executor::{ExecutionResult, Executor, ExecutorConfig};
use crate::handlers::register_builtin;
use crate::log::{ExecutionLog, ExecutionLogEntry, ExecutionStats, ExecutionStatus};
use crate::memory::MemoryStore;
use crate::registry::{HandlerRegistry, TaskContext};
use crate::router::{RouteDecision, TaskRouter, DEFAULT_RULES};
use crate::skills::{Skill, SkillBook};
use crate::storage::Database;
use crate::tasks::{Task, TaskStatus, TaskTracker, DEFAULT_PRIORITY};

/// Inbound task submission
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSubmission {
    pub task_description: String,
    #[serde(default)]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: TaskContext,
}

impl TaskSubmission {
    pub fn new(task_description: &str) -> Self {
        Self {
            task_description: task_description.to_string(),
            agent_type: None,
            priority: None,
            session_id: None,
            context: TaskContext::default(),
        }
    }

    pub fn with_agent(mut self, agent_type: &str) -> Self {
        self.agent_type = Some(agent_type.to_string());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = context;
        self
    }
}

/// Answer to a submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResponse {
    pub task_id: String,
    pub session_id: Option<String>,
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub agent_type: String,
    pub routing: RouteDecision,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub logs: Vec<ExecutionLogEntry>,
}

/// Aggregate view for dashboards
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    pub agents: usize,
    pub agents_by_status: BTreeMap<String, usize>,
    pub executions: ExecutionStats,
    pub tasks_by_status: BTreeMap<String, usize>,
}

/// Orchestrator facade
pub struct Orchestrator {
    registry: Arc<HandlerRegistry>,
    router: TaskRouter,
    executor: Executor,
    log: ExecutionLog,
    skills: SkillBook,
    memory: MemoryStore,
    tasks: TaskTracker,
    recent_logs: usize,
}

impl Orchestrator {
    /// Build from an already populated registry
    pub fn new(db: Arc<Database>, registry: HandlerRegistry, config: &Config) -> Result<Self> {
        Self::assemble(
            db,
            registry,
            &config.default_agent,
            config.executor_config(),
            config.recent_logs,
        )
    }

    /// Build with a handler for every catalog agent
    pub fn with_builtin_handlers(db: Arc<Database>, config: &Config) -> Result<Self> {
        let memory = MemoryStore::new(Arc::clone(&db));
        let mut registry = HandlerRegistry::new();
        register_builtin(&mut registry, &memory);
        Self::new(db, registry, config)
    }

    fn assemble(
        db: Arc<Database>,
        registry: HandlerRegistry,
        default_agent: &str,
        executor_config: ExecutorConfig,
        recent_logs: usize,
    ) -> Result<Self> {
        let registry = Arc::new(registry);
        let router = TaskRouter::with_rules(Arc::clone(&registry), DEFAULT_RULES.to_vec(), default_agent);
        let executor = Executor::new(Arc::clone(&registry), Arc::clone(&db), executor_config)?;

        Ok(Self {
            registry,
            router,
            executor,
            log: ExecutionLog::new(Arc::clone(&db)),
            skills: SkillBook::new(Arc::clone(&db)),
            memory: MemoryStore::new(Arc::clone(&db)),
            tasks: TaskTracker::new(db),
            recent_logs,
        })
    }

    /// Track, route and execute one submission
    pub async fn submit(&self, submission: TaskSubmission) -> Result<SubmissionResponse> {
        let description = submission.task_description.trim().to_string();
        if description.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "task_description must not be empty".to_string(),
            ));
        }

        let priority = submission.priority.unwrap_or(DEFAULT_PRIORITY);
        let task = self.tasks.create_in_session(
            &description,
            priority,
            submission.session_id.as_deref(),
        )?;

        let routing = self
            .router
            .route(&description, submission.agent_type.as_deref());
        info!(
            "Task {} routed to {} ({})",
            task.id, routing.agent_type, routing.reasoning
        );
        if let Err(e) = self.tasks.start(&task.id, &routing.agent_type) {
            abandon_task(&self.tasks, &task.id, &e);
            return Err(e);
        }

        // Dropped with this future, which tells the submission to stop
        let (caller_alive, caller_gone) = oneshot::channel::<()>();
        let unit = tokio::spawn(run_submission(
            self.executor.clone(),
            self.tasks.clone(),
            task.id.clone(),
            routing.agent_type.clone(),
            description,
            submission.context,
            caller_gone,
        ));
        let joined = unit.await;
        drop(caller_alive);

        let result = match joined {
            Ok(result) => result?,
            Err(e) => {
                let e = OrchestratorError::Interrupted(e.to_string());
                abandon_task(&self.tasks, &task.id, &e);
                return Err(e);
            }
        };

        let logs = self
            .log
            .query(&routing.agent_type, self.recent_logs, None)?;

        Ok(SubmissionResponse {
            task_id: task.id,
            session_id: task.session_id,
            execution_id: result.execution_id.clone(),
            status: result.status(),
            agent_type: routing.agent_type.clone(),
            result: result.value().cloned(),
            error: result.error(),
            duration_ms: result.duration_ms,
            routing,
            logs,
        })
    }

    /// Run a task on a named agent, without routing or task tracking. The
    /// execution is logged and counted like any other; a failed outcome comes
    /// back as the matching error.
    pub async fn execute_on(&self, agent_type: &str, task: &str, ctx: TaskContext) -> Result<Value> {
        let task = task.trim();
        if task.is_empty() {
            return Err(OrchestratorError::InvalidInput("task must not be empty".to_string()));
        }
        self.executor.execute(agent_type, task, ctx).await?.into_result()
    }

    pub fn route(&self, description: &str, explicit: Option<&str>) -> RouteDecision {
        self.router.route(description, explicit)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    fn agents_dir(&self) -> &AgentDirectory {
        self.executor.agents()
    }

    pub fn agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>> {
        self.agents_dir().list(filter)
    }

    pub fn agent(&self, id: &str) -> Result<Agent> {
        self.agents_dir()
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(format!("agent {}", id)))
    }

    pub fn set_agent_status(&self, id: &str, status: AgentStatus) -> Result<Agent> {
        self.agents_dir().set_status(id, status)
    }

    /// Log entries for an agent type, newest first. Unregistered types have
    /// logs too (failed lookups), so this never reports `NotFound`.
    pub fn agent_logs(
        &self,
        id: &str,
        limit: usize,
        status: Option<ExecutionStatus>,
    ) -> Result<Vec<ExecutionLogEntry>> {
        self.log.query(id, limit, status)
    }

    pub fn agent_skills(&self, id: &str) -> Result<Vec<Skill>> {
        self.agent(id)?;
        self.skills.list(id)
    }

    pub fn tasks(&self, status: Option<TaskStatus>, limit: usize) -> Result<Vec<Task>> {
        self.tasks.list(status, limit)
    }

    pub fn session_tasks(&self, session_id: &str, limit: usize) -> Result<Vec<Task>> {
        self.tasks.list_session(session_id, limit)
    }

    pub fn task(&self, id: &str) -> Result<Task> {
        self.tasks
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(format!("task {}", id)))
    }

    pub fn stats(&self) -> Result<OrchestratorStats> {
        let agents = self.agents(&AgentFilter::default())?;
        let mut agents_by_status = BTreeMap::new();
        for agent in &agents {
            *agents_by_status
                .entry(agent.status.to_string())
                .or_insert(0) += 1;
        }

        let mut tasks_by_status = BTreeMap::new();
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let count = self.tasks.count(Some(status))?;
            tasks_by_status.insert(status.to_string(), count);
        }

        Ok(OrchestratorStats {
            agents: agents.len(),
            agents_by_status,
            executions: self.log.stats(None)?,
            tasks_by_status,
        })
    }
}

async fn run_submission(
    executor: Executor,
    tasks: TaskTracker,
    task_id: String,
    agent_type: String,
    description: String,
    context: TaskContext,
    caller_gone: oneshot::Receiver<()>,
) -> Result<ExecutionResult> {
    let executed = tokio::select! {
        executed = executor.execute(&agent_type, &description, context) => executed,
        // Dropping the execution aborts the handler; it is still logged
        _ = caller_gone => Err(OrchestratorError::Interrupted(
            "caller stopped waiting".to_string(),
        )),
    };

    let result = match executed {
        Ok(result) => result,
        Err(e) => {
            abandon_task(&tasks, &task_id, &e);
            return Err(e);
        }
    };

    let finished = match result.error() {
        None => tasks.complete(&task_id, result.value()),
        Some(error) => tasks.fail(&task_id, &error),
    };
    if let Err(e) = finished {
        abandon_task(&tasks, &task_id, &e);
        return Err(e);
    }
    Ok(result)
}

// Best effort: the store that caused `cause` may refuse this write too
fn abandon_task(tasks: &TaskTracker, task_id: &str, cause: &OrchestratorError) {
    if let Err(e) = tasks.fail(task_id, &cause.to_string()) {
        warn!("Task {} left unfinished after {}: {}", task_id, cause, e);
    }
}
