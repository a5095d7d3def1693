//! Agent Orchestrator - Entry Point
//!
//! Modes:
//! - serve (default): HTTP API
//! - run <task> [--agent <type>] [--session <id>]: submit one task, print the JSON response
//! - agents: print the agent catalog

use agent_orchestrator::catalog::CATALOG;
use agent_orchestrator::{ApiServer, Config, Database, Orchestrator, TaskSubmission};
use anyhow::bail;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

enum Mode {
    Serve,
    Run {
        task: String,
        agent: Option<String>,
        session: Option<String>,
    },
    Agents,
    Help,
}

fn parse_args(args: &[String]) -> anyhow::Result<Mode> {
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(Mode::Help);
    }

    match args.first().map(|s| s.as_str()) {
        None | Some("serve") => Ok(Mode::Serve),
        Some("agents") => Ok(Mode::Agents),
        Some("run") => {
            let mut task = Vec::new();
            let mut agent = None;
            let mut session = None;
            let mut rest = args[1..].iter();
            while let Some(arg) = rest.next() {
                if arg == "--agent" || arg == "-a" {
                    match rest.next() {
                        Some(a) => agent = Some(a.clone()),
                        None => bail!("--agent requires a value"),
                    }
                } else if arg == "--session" || arg == "-s" {
                    match rest.next() {
                        Some(s) => session = Some(s.clone()),
                        None => bail!("--session requires a value"),
                    }
                } else {
                    task.push(arg.as_str());
                }
            }
            if task.is_empty() {
                bail!("run requires a task description");
            }
            Ok(Mode::Run {
                task: task.join(" "),
                agent,
                session,
            })
        }
        Some(other) => bail!("unknown command: {} (see --help)", other),
    }
}

fn print_help() {
    println!("Agent Orchestrator v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: agent-orchestrator [COMMAND]");
    println!();
    println!("Commands:");
    println!("  serve                          Run the HTTP API (default)");
    println!("  run <task> [--agent <type>]    Submit one task and print the result");
    println!("      [--session <id>]           Tag the task with a session");
    println!("  agents                         List the agent catalog");
    println!();
    println!("Options:");
    println!("  --help, -h         Show this help");
    println!();
    println!("Environment variables:");
    println!("  ORCHESTRATOR_DB_PATH         SQLite path");
    println!("  ORCHESTRATOR_TIMEOUT_SECS    Handler timeout (default: 30)");
    println!("  ORCHESTRATOR_DEFAULT_AGENT   Router fallback (default: orchestrator)");
    println!("  ORCHESTRATOR_XP_PER_SUCCESS  XP per success (default: 10)");
    println!("  ORCHESTRATOR_BIND_ADDR       Bind address (default: 127.0.0.1)");
    println!("  ORCHESTRATOR_PORT            Port (default: 8003)");
    println!("  ORCHESTRATOR_LOG_REQUESTS    Request tracing (default: true)");
    println!("  ORCHESTRATOR_RECENT_LOGS     Logs returned per submission (default: 10)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = parse_args(&args)?;

    match mode {
        Mode::Help => {
            print_help();
            return Ok(());
        }
        Mode::Agents => {
            for entry in CATALOG {
                println!(
                    "{:<22} {:<10} {}",
                    entry.agent_type,
                    entry.category.as_str(),
                    entry.capabilities.join(", ")
                );
            }
            return Ok(());
        }
        _ => {}
    }

    // Setup logging based on mode
    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if matches!(mode, Mode::Serve) {
        // Interactive mode - log to stdout with colors
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // One-shot mode - stdout carries only the result, log to stderr as JSON
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = Config::from_env()?;
    let db = Arc::new(Database::open(&config.db_path)?);
    let orchestrator = Arc::new(Orchestrator::with_builtin_handlers(db, &config)?);

    match mode {
        Mode::Run {
            task,
            agent,
            session,
        } => {
            let mut submission = TaskSubmission::new(&task);
            if let Some(agent) = agent {
                submission = submission.with_agent(&agent);
            }
            if let Some(session) = session {
                submission = submission.with_session(&session);
            }
            let response = orchestrator.submit(submission).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        _ => {
            info!("Agent Orchestrator v{}", env!("CARGO_PKG_VERSION"));
            let server = ApiServer::new(orchestrator, config.socket_addr()?, config.log_requests);
            server.run().await?;
        }
    }

    Ok(())
}
