//! Agent Orchestrator
//!
//! Task routing and delegation for platform agents.
//!
//! # Features
//!
//! - **Handler Registry**: agent-type key to async handler, built once at startup
//! - **Keyword Routing**: explicit type hint, then fixed-order keyword rules, then a default
//! - **Bounded Execution**: wall-clock timeout with hard abort, panic isolation
//! - **Execution Log**: append-only, newest-first queries per agent
//! - **Skill Accounting**: XP and levels from a fixed threshold table
//! - **Memory Store**: (owner, type, key) result cache with upsert semantics
//! - **HTTP API**: submission, agent, log, skill, memory and stats endpoints
//!
//! # Architecture
//!
//! ```text
//! HTTP / CLI ──► Orchestrator ──► Router ──► Executor ──► Handler
//!                     │                         │
//!                     ├── TaskTracker           ├── ExecutionLog  ┐
//!                     └── MemoryStore           ├── AgentDirectory├─ one transaction
//!                                               └── SkillBook     ┘
//!                                 (SQLite)
//! ```

pub mod agent;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod log;
pub mod memory;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod skills;
pub mod storage;
pub mod tasks;

pub use agent::{Agent, AgentCategory, AgentDescriptor, AgentDirectory, AgentFilter, AgentStatus};
pub use api::{api_router, ApiServer, AppState};
pub use config::Config;
pub use error::{OrchestratorError, Result};
pub use executor::{ExecutionRequest, ExecutionResult, Executor, ExecutorConfig, FailureKind, Outcome};
pub use log::{ExecutionLog, ExecutionLogEntry, ExecutionStats, ExecutionStatus};
pub use memory::{MemoryRecord, MemoryStore};
pub use orchestrator::{Orchestrator, OrchestratorStats, SubmissionResponse, TaskSubmission};
pub use registry::{FnHandler, Handler, HandlerError, HandlerRegistry, HandlerResult, TaskContext};
pub use router::{RouteDecision, RouteRule, RouteSource, TaskRouter};
pub use skills::{level_for_xp, Skill, SkillBook, LEVEL_THRESHOLDS};
pub use storage::Database;
pub use tasks::{Task, TaskStatus, TaskTracker};
