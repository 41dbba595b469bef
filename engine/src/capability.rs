//! External capabilities the debate depends on.
//!
//! Both traits are implemented outside the engine (HTTP language-model
//! clients in production, scripted fakes in tests) and injected into the
//! orchestrator as `Arc<dyn …>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debate::state::DebateRole;
use crate::financials::FinancialReport;
use crate::simulation::AggregatedSimulation;

/// Errors from a capability call. None of these are retried by the engine.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("response parse error: {0}")]
    ParseError(String),

    #[error("rate limited: retry after {0}s")]
    RateLimited(u64),

    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

/// Which step of the debate a prompt is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStage {
    /// Optimist's round-1 position.
    Opening,
    /// Skeptic's round-1 reply to the opening.
    Challenge,
    /// Optimist's reply in rounds 2+.
    Response,
    /// Skeptic's reply in rounds 2+.
    Counter,
}

impl DebateStage {
    /// Transcript topic label for a turn at this stage.
    pub fn topic(self, round: u32) -> String {
        match self {
            Self::Opening => "Opening Position".to_string(),
            Self::Challenge => "Initial Challenge".to_string(),
            Self::Response => format!("Round {} Response", round),
            Self::Counter => format!("Round {} Counter", round),
        }
    }

    pub fn role(self) -> DebateRole {
        match self {
            Self::Opening | Self::Response => DebateRole::Optimist,
            Self::Challenge | Self::Counter => DebateRole::Skeptic,
        }
    }
}

impl std::fmt::Display for DebateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Challenge => write!(f, "challenge"),
            Self::Response => write!(f, "response"),
            Self::Counter => write!(f, "counter"),
        }
    }
}

/// The numbers a debate turn may cite: historical baseline and simulated outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateFacts {
    pub company: String,
    pub historical_revenue: f64,
    pub historical_opex: f64,
    pub historical_ebitda: f64,
    /// OpEx / revenue; `None` when revenue is not positive.
    pub opex_ratio: Option<f64>,
    pub median_npv: f64,
    pub p10_npv: f64,
    pub p90_npv: f64,
    pub median_revenue: f64,
    pub median_ebitda: f64,
    pub median_fcf: f64,
    /// Assumptions behind the simulated numbers, in application order.
    pub assumptions: Vec<String>,
}

impl DebateFacts {
    pub fn new(report: &FinancialReport, simulation: &AggregatedSimulation) -> Self {
        let stmt = &report.income_statement;
        Self {
            company: report.label(),
            historical_revenue: stmt.revenue,
            historical_opex: stmt.opex,
            historical_ebitda: stmt.ebitda,
            opex_ratio: stmt.opex_ratio(),
            median_npv: simulation.median_npv,
            p10_npv: simulation.p10_npv,
            p90_npv: simulation.p90_npv,
            median_revenue: simulation.median_revenue,
            median_ebitda: simulation.median_ebitda,
            median_fcf: simulation.median_fcf,
            assumptions: simulation.assumption_log.clone(),
        }
    }
}

/// Guidance carried forward from a rejected attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectiveFeedback {
    /// 1-based attempt that was rejected.
    pub attempt: u32,
    pub issues: Vec<String>,
    pub feedback: String,
}

/// Everything an agent needs to produce one debate turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub role: DebateRole,
    pub stage: DebateStage,
    pub round: u32,
    pub facts: DebateFacts,
    /// The opponent's latest message, absent for the opening.
    pub opponent_message: Option<String>,
    /// Condensed prefix of the speaker's own prior turns.
    pub digest: Option<String>,
    /// Rejections accumulated within the current turn.
    #[serde(default)]
    pub corrective_feedback: Vec<CorrectiveFeedback>,
}

impl PromptContext {
    pub fn new(stage: DebateStage, round: u32, facts: DebateFacts) -> Self {
        Self {
            role: stage.role(),
            stage,
            round,
            facts,
            opponent_message: None,
            digest: None,
            corrective_feedback: Vec::new(),
        }
    }

    pub fn with_opponent_message(mut self, message: impl Into<String>) -> Self {
        self.opponent_message = Some(message.into());
        self
    }

    /// Attach a digest; an empty digest is dropped.
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        let digest = digest.into();
        self.digest = (!digest.is_empty()).then_some(digest);
        self
    }

    pub fn is_retry(&self) -> bool {
        !self.corrective_feedback.is_empty()
    }
}

/// Outcome of a statement consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingVerdict {
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

impl GroundingVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
            feedback: String::new(),
        }
    }

    pub fn invalid(issues: Vec<String>, feedback: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            issues,
            feedback: feedback.into(),
        }
    }
}

/// One debate participant.
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    /// Speaker name recorded in the transcript (e.g. the backing model family).
    fn name(&self) -> &str;

    /// Produce the text of one turn.
    async fn respond(&self, context: &PromptContext) -> Result<String, CapabilityError>;
}

/// Checks that a statement only cites numbers present in the inputs.
#[async_trait]
pub trait StatementConsistency: Send + Sync {
    async fn validate_statement(
        &self,
        text: &str,
        report: &FinancialReport,
        simulation: &AggregatedSimulation,
    ) -> Result<GroundingVerdict, CapabilityError>;
}
