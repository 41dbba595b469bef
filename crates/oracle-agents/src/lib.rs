//! Language-model capabilities and runtime configuration for the
//! counterfactual oracle.
//!
//! - [`agents`]: Gemini and chat-completions debate participants, plus the
//!   LLM-backed grounding checker
//! - [`prompts`]: persona and stage templates
//! - [`config`]: endpoint, simulation, and debate settings from env + TOML

pub mod agents;
pub mod config;
pub mod prompts;

use anyhow::{Context, Result};
use oracle_engine::FinancialReport;
use std::path::Path;

pub use agents::{AgentSet, ChatCompletionsAgent, GeminiAgent, LanguageModel, LlmGroundingChecker};
pub use config::{Endpoint, OracleConfig, Provider};

/// Read a financial report in the ingestion JSON schema.
pub fn load_report(path: &Path) -> Result<FinancialReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report JSON {}", path.display()))
}
