//! Counterfactual Oracle Engine
//!
//! Deterministic core of the oracle:
//! - Financial statement data model and sanity validator
//! - Cash-flow and valuation math (FCF, NPV, Gordon growth terminal value)
//! - Monte Carlo DCF simulation over counterfactual scenarios
//! - Optimist/skeptic debate orchestration with grounding checks,
//!   convergence detection, and consensus synthesis
//!
//! # Usage
//!
//! ```no_run
//! use oracle_engine::{run_simulation, FinancialReport, ScenarioParams};
//!
//! # fn demo(report: FinancialReport) -> oracle_engine::OracleResult<()> {
//! let scenario = ScenarioParams::baseline().with_revenue_growth_bps(500);
//! let simulation = run_simulation(&report, &scenario, 10_000)?;
//! println!("median NPV {}", simulation.median_npv);
//! # Ok(())
//! # }
//! ```
//!
//! The debate needs two [`ReasoningAgent`]s and a [`StatementConsistency`]
//! checker supplied by the caller; this crate performs no network I/O.

#![allow(clippy::uninlined_format_args)]

pub mod capability;
pub mod debate;
pub mod error;
pub mod financials;
pub mod simulation;
pub mod validator;
pub mod valuation;

pub use capability::{
    CapabilityError, CorrectiveFeedback, DebateFacts, DebateStage, GroundingVerdict,
    PromptContext, ReasoningAgent, StatementConsistency,
};
pub use debate::{
    ConfidenceLevel, ConvergenceStrategy, DebateConfig, DebateOrchestrator, DebatePhase,
    DebateResult, DebateRole, DebateTurn, KeywordConvergence, Lexicon, Verdict,
};
pub use error::{OracleError, OracleResult};
pub use financials::{
    format_usd, BalanceSheet, CashFlow, FinancialReport, IncomeStatement, ScenarioParams,
};
pub use simulation::{
    run_simulation, AggregatedSimulation, MonteCarloEngine, SimulationConfig, SimulationResult,
};
pub use validator::{
    check_balance_sheet, validate_balance_sheet, validate_income_statement, validate_report,
    validate_scenario, validate_scenario_at, validate_scenario_params, BalanceCheck, Severity,
    ValidationIssue,
};
pub use valuation::{free_cash_flow, net_present_value, terminal_value};
