//! Debate Orchestration: Optimist/Skeptic Grounded Debate
//!
//! State machine for a structured debate over a simulated scenario. Every
//! optimist turn passes through a statement consistency check before it is
//! logged; convergence is detected from the transcript and the finished
//! debate is distilled into a verdict.
//!
//! # Debate Flow
//!
//! ```text
//! Opening → Challenged → Responding ──[converged?]── Yes → Converged
//!  (round 1)   (round 1)     ▲  (round n)    │
//!                            │               No
//!                            │               ▼
//!                            └──────── Countering ── max rounds → Exhausted
//!
//! optimist turns: respond → validate → [rejected?] → retry with feedback
//!                 (best effort after the last attempt, or abort in strict mode)
//! capability failure at any point → Aborted
//! ```

pub mod consensus;
pub mod guardrails;
pub mod orchestrator;
pub mod state;

pub use consensus::{
    synthesize, ConfidenceLevel, ConsensusReport, ConvergenceSignal, ConvergenceStrategy,
    KeywordConvergence, Lexicon, Verdict,
};
pub use guardrails::{ConvergenceTracker, DebateConfig, GuardrailOutcome};
pub use orchestrator::{DebateOrchestrator, DebateResult};
pub use state::{
    DebatePhase, DebateRole, DebateSession, DebateTransition, DebateTurn, TransitionError,
};
