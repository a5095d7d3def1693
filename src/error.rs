//! Orchestrator Errors
//!
//! Unknown agents, handler failures and timeouts are recovered inside the
//! executor and turned into logged failure results. Persistence errors are the
//! only kind that reach the caller of `execute`.

use thiserror::Error;

/// Orchestrator errors
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),
    #[error("Handler error: {0}")]
    Handler(String),
    #[error("Agent {agent_type} timed out after {after_ms}ms")]
    Timeout { agent_type: String, after_ms: u64 },
    #[error("Agent {agent_type} unavailable (status: {status})")]
    AgentUnavailable { agent_type: String, status: String },
    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: String,
        to: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Execution interrupted: {0}")]
    Interrupted(String),
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    /// Short machine-readable code, used in logs and API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownAgent(_) => "unknown_agent",
            Self::Handler(_) => "handler_error",
            Self::Timeout { .. } => "timeout",
            Self::AgentUnavailable { .. } => "agent_unavailable",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Interrupted(_) => "interrupted",
            Self::Persistence(_) => "persistence_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Whether the failure happened while reading or writing state.
    /// These are surfaced to the caller, who may retry the whole operation.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Serialization(_) | Self::Io(_))
    }
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
