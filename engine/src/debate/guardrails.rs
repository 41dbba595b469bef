//! Round budget, retry budget, and convergence streak tracking.

use serde::{Deserialize, Serialize};

use super::consensus::ConvergenceSignal;
use crate::error::{OracleError, OracleResult};

/// Why the round loop should stop, if it should.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardrailOutcome {
    /// Keep debating.
    Continue,
    /// Agreement streak reached the threshold.
    Converged { round: u32, streak: u32 },
    /// Round budget spent.
    Exhausted { rounds: u32 },
}

impl GuardrailOutcome {
    pub fn should_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

impl std::fmt::Display for GuardrailOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Converged { round, streak } => {
                write!(f, "converged at round {} ({} consecutive)", round, streak)
            }
            Self::Exhausted { rounds } => write!(f, "max_rounds_exhausted ({})", rounds),
        }
    }
}

/// Debate tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Hard ceiling on rounds, including round 1.
    pub max_rounds: u32,
    /// Consecutive converging checks needed to stop.
    pub convergence_threshold: u32,
    /// Optimist attempts per turn before best-effort acceptance.
    pub validation_attempts: u32,
    /// Abort instead of accepting an ungrounded optimist turn.
    pub strict_grounding: bool,
    /// Characters kept from each prior turn in a digest.
    pub digest_chars: usize,
    /// Turns inspected by the default convergence check.
    pub convergence_window: usize,
    /// Agreement hits the default convergence check needs.
    pub min_agreement_hits: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            convergence_threshold: 2,
            validation_attempts: 3,
            strict_grounding: false,
            digest_chars: 100,
            convergence_window: 4,
            min_agreement_hits: 2,
        }
    }
}

impl DebateConfig {
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: u32) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_grounding = true;
        self
    }

    pub fn validate(&self) -> OracleResult<()> {
        for (name, value) in [
            ("max_rounds", self.max_rounds),
            ("convergence_threshold", self.convergence_threshold),
            ("validation_attempts", self.validation_attempts),
        ] {
            if value == 0 {
                return Err(OracleError::InvalidInput(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        for (name, value) in [
            ("convergence_window", self.convergence_window),
            ("min_agreement_hits", self.min_agreement_hits),
        ] {
            if value == 0 {
                return Err(OracleError::InvalidInput(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Counts consecutive converging checks; any non-converging check resets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceTracker {
    threshold: u32,
    streak: u32,
}

impl ConvergenceTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            streak: 0,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Record the check made after the optimist's turn in `round`.
    pub fn observe(&mut self, round: u32, signal: &ConvergenceSignal) -> GuardrailOutcome {
        if signal.converging {
            self.streak += 1;
        } else {
            self.streak = 0;
        }

        if self.streak >= self.threshold {
            GuardrailOutcome::Converged {
                round,
                streak: self.streak,
            }
        } else {
            GuardrailOutcome::Continue
        }
    }
}
