//! Task Router
//!
//! Picks the agent type for a task. An explicit, registered type always wins;
//! otherwise the lowercased description is tokenized and checked against a
//! fixed, ordered list of keyword rules. The first rule with a matching
//! keyword wins, and the configured default catches everything else.
//!
//! Rule order matters where vocabulary overlaps: security comes first, so
//! "scan this wallet for phishing risk" goes to `security`, not `blockchain`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::registry::HandlerRegistry;

/// Fallback agent when no rule matches
pub const DEFAULT_AGENT: &str = "orchestrator";

/// A keyword set bound to an agent type
#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub agent_type: &'static str,
    pub keywords: &'static [&'static str],
}

// Keyword sets, in priority order
static SECURITY_KEYWORDS: &[&str] = &[
    "security", "threat", "threats", "scan", "phishing", "fraud",
    "vulnerability", "exploit", "audit", "malware", "pentest", "breach",
    "suspicious",
];

static KYC_KEYWORDS: &[&str] = &[
    "kyc", "aml", "identity", "verification", "verify", "passport",
];

static PAYMENT_KEYWORDS: &[&str] = &[
    "payment", "payments", "pay", "invoice", "checkout", "refund", "payout",
    "fiat", "card",
];

static TRADING_KEYWORDS: &[&str] = &[
    "trade", "trading", "order", "buy", "sell", "swap", "arbitrage", "dca",
    "scalping", "momentum",
];

static BLOCKCHAIN_KEYWORDS: &[&str] = &[
    "blockchain", "wallet", "wallets", "nft", "token", "tokens", "contract",
    "mint", "ethereum", "polygon", "gas", "onchain",
];

static PORTFOLIO_KEYWORDS: &[&str] = &[
    "portfolio", "stocks", "bonds", "forex", "ira", "401k", "pension",
    "retirement", "dividend", "metals",
];

static ANALYTICS_KEYWORDS: &[&str] = &[
    "analytics", "report", "metrics", "statistics", "chart", "trend", "forecast",
];

static COMMUNICATION_KEYWORDS: &[&str] = &[
    "email", "mail", "message", "notify", "notification", "sms", "chat",
];

static EDUCATION_KEYWORDS: &[&str] = &[
    "learn", "tutorial", "course", "lesson", "explain",
];

/// Default rule table
pub static DEFAULT_RULES: &[RouteRule] = &[
    RouteRule { agent_type: "security", keywords: SECURITY_KEYWORDS },
    RouteRule { agent_type: "kyc", keywords: KYC_KEYWORDS },
    RouteRule { agent_type: "payment", keywords: PAYMENT_KEYWORDS },
    RouteRule { agent_type: "advanced_trading", keywords: TRADING_KEYWORDS },
    RouteRule { agent_type: "blockchain", keywords: BLOCKCHAIN_KEYWORDS },
    RouteRule { agent_type: "portfolio", keywords: PORTFOLIO_KEYWORDS },
    RouteRule { agent_type: "analytics", keywords: ANALYTICS_KEYWORDS },
    RouteRule { agent_type: "communication", keywords: COMMUNICATION_KEYWORDS },
    RouteRule { agent_type: "education", keywords: EDUCATION_KEYWORDS },
];

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("valid token regex"));

/// How a decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    Explicit,
    Keyword,
    Default,
}

/// Routing decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDecision {
    pub agent_type: String,
    pub source: RouteSource,
    pub matched_keyword: Option<String>,
    pub reasoning: String,
}

/// Deterministic keyword router
pub struct TaskRouter {
    registry: Arc<HandlerRegistry>,
    rules: Vec<RouteRule>,
    default_agent: String,
}

impl TaskRouter {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_rules(registry, DEFAULT_RULES.to_vec(), DEFAULT_AGENT)
    }

    pub fn with_rules(
        registry: Arc<HandlerRegistry>,
        rules: Vec<RouteRule>,
        default_agent: &str,
    ) -> Self {
        Self {
            registry,
            rules,
            default_agent: default_agent.to_string(),
        }
    }

    /// Rules in the order they are tried
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    /// Route a task description, honoring an explicit type when registered
    pub fn route(&self, description: &str, explicit: Option<&str>) -> RouteDecision {
        // 1. Explicit type always wins when it is registered
        if let Some(agent_type) = explicit {
            if self.registry.contains(agent_type) {
                return RouteDecision {
                    agent_type: agent_type.to_string(),
                    source: RouteSource::Explicit,
                    matched_keyword: None,
                    reasoning: format!("Explicit agent type {}", agent_type),
                };
            }
            debug!("Explicit agent type {} not registered, routing by keywords", agent_type);
        }

        // 2. Keyword rules, first match wins
        let lower = description.to_lowercase();
        let tokens: HashSet<&str> = TOKEN_PATTERN.find_iter(&lower).map(|m| m.as_str()).collect();

        for rule in &self.rules {
            if let Some(keyword) = rule.keywords.iter().find(|kw| tokens.contains(*kw)) {
                return RouteDecision {
                    agent_type: rule.agent_type.to_string(),
                    source: RouteSource::Keyword,
                    matched_keyword: Some(keyword.to_string()),
                    reasoning: format!("Matched keyword '{}'", keyword),
                };
            }
        }

        // 3. Default
        RouteDecision {
            agent_type: self.default_agent.clone(),
            source: RouteSource::Default,
            matched_keyword: None,
            reasoning: "No keyword matched".to_string(),
        }
    }
}
