//! Configuration management

use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::ExecutorConfig;
use crate::router::DEFAULT_AGENT;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path
    pub db_path: PathBuf,

    /// Wall-clock budget per handler invocation
    pub timeout: Duration,

    /// Router fallback agent
    pub default_agent: String,

    /// XP credited per successful execution
    pub xp_per_success: u64,

    /// HTTP bind address
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// Enable request tracing on the HTTP surface
    pub log_requests: bool,

    /// Log entries returned with a submission
    pub recent_logs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            timeout: Duration::from_secs(30),
            default_agent: DEFAULT_AGENT.to_string(),
            xp_per_success: 10,
            bind_addr: "127.0.0.1".to_string(),
            port: 8003,
            log_requests: true,
            recent_logs: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. Malformed numbers fall back to
    /// defaults; a zero timeout is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let db_path = lookup("ORCHESTRATOR_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let timeout_secs: u64 = lookup("ORCHESTRATOR_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout.as_secs());
        if timeout_secs == 0 {
            bail!("ORCHESTRATOR_TIMEOUT_SECS must be greater than zero");
        }

        let default_agent = lookup("ORCHESTRATOR_DEFAULT_AGENT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.default_agent);

        let xp_per_success = lookup("ORCHESTRATOR_XP_PER_SUCCESS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.xp_per_success);

        let bind_addr = lookup("ORCHESTRATOR_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let port = lookup("ORCHESTRATOR_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let log_requests = lookup("ORCHESTRATOR_LOG_REQUESTS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.log_requests);

        let recent_logs = lookup("ORCHESTRATOR_RECENT_LOGS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.recent_logs);

        Ok(Self {
            db_path,
            timeout: Duration::from_secs(timeout_secs),
            default_agent,
            xp_per_success,
            bind_addr,
            port,
            log_requests,
            recent_logs,
        })
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            timeout: self.timeout,
            xp_per_success: self.xp_per_success,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agent-orchestrator")
        .join("orchestrator.db")
}
