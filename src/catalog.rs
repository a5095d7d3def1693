//! Agent Catalog
//!
//! Every agent type the platform knows about, grouped by category.

use crate::agent::{AgentCategory, AgentDescriptor};

/// One catalog row
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub agent_type: &'static str,
    pub name: &'static str,
    pub category: AgentCategory,
    pub capabilities: &'static [&'static str],
}

impl CatalogEntry {
    pub fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(self.agent_type, self.name, self.category)
            .with_capabilities(self.capabilities)
    }
}

macro_rules! entry {
    ($ty:literal, $name:literal, $cat:ident, [$($cap:literal),* $(,)?]) => {
        CatalogEntry {
            agent_type: $ty,
            name: $name,
            category: AgentCategory::$cat,
            capabilities: &[$($cap),*],
        }
    };
}

pub static CATALOG: &[CatalogEntry] = &[
    // Core
    entry!("orchestrator", "Orchestrator", Core, ["routing", "delegation", "coordination"]),
    entry!("blockchain", "Blockchain Agent", Core, ["multi_chain", "transactions", "smart_contracts"]),
    entry!("web3", "Web3 Agent", Core, ["dapp_integration", "wallet_connect"]),
    entry!("payment", "Payment Agent", Core, ["fiat_payments", "crypto_payments", "refunds"]),
    entry!("kyc", "KYC Agent", Core, ["identity_verification", "aml_screening"]),
    entry!("security", "Security Agent", Core, ["threat_detection", "risk_scoring", "address_screening"]),
    entry!("guardian_angel", "Guardian Angel", Core, ["continuous_monitoring", "anomaly_alerts"]),
    entry!("publishing", "Publishing Agent", Core, ["content_publishing"]),
    entry!("quantum", "Quantum Agent", Core, ["optimization"]),
    entry!("analytics", "Analytics Agent", Core, ["reporting", "metrics", "trend_analysis"]),
    entry!("monitoring", "Monitoring Agent", Core, ["health_checks", "alerting"]),
    // Financial
    entry!("401k", "401(k) Agent", Financial, ["retirement_planning", "contribution_tracking"]),
    entry!("ira", "IRA Agent", Financial, ["retirement_planning", "rollover"]),
    entry!("pension", "Pension Agent", Financial, ["pension_projection"]),
    entry!("bonds", "Bonds Agent", Financial, ["yield_analysis", "ladder_building"]),
    entry!("stocks", "Stocks Agent", Financial, ["equity_trading", "quotes"]),
    entry!("options", "Options Agent", Financial, ["options_pricing", "greeks"]),
    entry!("forex", "Forex Agent", Financial, ["currency_pairs", "rates"]),
    entry!("metals", "Metals Agent", Financial, ["precious_metals", "spot_prices"]),
    entry!("commodities", "Commodities Agent", Financial, ["futures", "spot_prices"]),
    entry!("mutual_funds", "Mutual Funds Agent", Financial, ["fund_screening"]),
    entry!("reit", "REIT Agent", Financial, ["real_estate_income"]),
    entry!("crypto_derivatives", "Crypto Derivatives Agent", Financial, ["perpetuals", "futures"]),
    entry!("portfolio", "Portfolio Agent", Financial, ["allocation", "rebalancing", "performance"]),
    // Trading
    entry!("amm", "AMM Agent", Trading, ["pool_pricing", "swaps"]),
    entry!("liquidity", "Liquidity Agent", Trading, ["liquidity_provision"]),
    entry!("defi", "DeFi Agent", Trading, ["yield_farming", "protocol_integration"]),
    entry!("bridge", "Bridge Agent", Trading, ["cross_chain_transfer"]),
    entry!("lending", "Lending Agent", Trading, ["collateral_management", "borrowing"]),
    entry!("gas_optimizer", "Gas Optimizer", Trading, ["fee_estimation", "batching"]),
    entry!("mining", "Mining Agent", Trading, ["hashrate_tracking"]),
    entry!("advanced_trading", "Advanced Trading Agent", Trading, ["grid", "dca", "arbitrage", "scalping", "market_making", "momentum"]),
    // Wallet
    entry!("hd_wallet", "HD Wallet Agent", Wallet, ["key_derivation", "address_generation"]),
    entry!("hardware_wallet", "Hardware Wallet Agent", Wallet, ["device_signing"]),
    entry!("multisig", "Multisig Agent", Wallet, ["threshold_signing", "approvals"]),
    entry!("seed_management", "Seed Management Agent", Wallet, ["backup", "recovery"]),
    entry!("privacy", "Privacy Agent", Wallet, ["address_rotation"]),
    // Platform
    entry!("admin", "Admin Agent", Platform, ["user_management", "configuration"]),
    entry!("dashboard", "Dashboard Agent", Platform, ["widgets", "summaries"]),
    entry!("contact_manager", "Contact Manager", Platform, ["contacts"]),
    entry!("communication", "Communication Agent", Platform, ["notifications", "messaging"]),
    entry!("mail", "Mail Agent", Platform, ["email"]),
    entry!("translation", "Translation Agent", Platform, ["localization"]),
    entry!("education", "Education Agent", Platform, ["tutorials", "courses"]),
    entry!("onboarding", "Onboarding Agent", Platform, ["account_setup"]),
    entry!("vip_desk", "VIP Desk", Platform, ["concierge"]),
    entry!("enterprise", "Enterprise Agent", Platform, ["team_accounts"]),
    entry!("escrow", "Escrow Agent", Platform, ["escrow_release", "dispute_handling"]),
    // Analytics
    entry!("portfolio_analytics", "Portfolio Analytics", Analytics, ["risk_metrics", "attribution"]),
    entry!("transaction_history", "Transaction History", Analytics, ["history_export", "categorization"]),
    entry!("oracle", "Market Oracle", Analytics, ["price_feeds", "forecasting"]),
    entry!("word_bot", "Word Bot", Analytics, ["text_analysis"]),
    entry!("cyberlab", "Cyber Lab", Analytics, ["simulation"]),
    entry!("banking", "Banking Agent", Analytics, ["account_aggregation", "statements"]),
    // NFT
    entry!("nft_minting", "NFT Minting Agent", Nft, ["minting", "metadata"]),
    entry!("collectibles", "Collectibles Agent", Nft, ["valuation", "catalog"]),
    entry!("smart_contract", "Smart Contract Agent", Nft, ["deployment", "verification"]),
    // Community
    entry!("community_exchange", "Community Exchange", Community, ["p2p_trading", "chat"]),
    entry!("multichain", "Multichain Agent", Community, ["chain_aggregation"]),
    // Security
    entry!("security_lab", "Security Lab", Security, ["contract_risk_profile", "address_screening"]),
    entry!("penetration_testing", "Penetration Testing Agent", Security, ["attack_simulation"]),
    entry!("threat_detection", "Threat Detection Agent", Security, ["phishing_detection", "fraud_signals"]),
    entry!("compliance", "Compliance Agent", Security, ["policy_checks", "audit_trail"]),
];

/// Look up a catalog entry by agent type
pub fn find(agent_type: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.agent_type == agent_type)
}

/// Entries in one category
pub fn by_category(category: AgentCategory) -> impl Iterator<Item = &'static CatalogEntry> {
    CATALOG.iter().filter(move |e| e.category == category)
}
