//! Engine error types.

use thiserror::Error;

use crate::capability::CapabilityError;
use crate::debate::state::{DebateRole, TransitionError};

/// Result alias for engine operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors that abort a simulation or debate run.
///
/// Sanity warnings are never reported through this type; they travel as
/// [`crate::validator::ValidationIssue`] values next to a normal result.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Caller-supplied data cannot be simulated or debated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A reasoning or consistency capability call failed outright.
    #[error("{role} capability failed: {source}")]
    Capability {
        role: DebateRole,
        #[source]
        source: CapabilityError,
    },

    /// The statement consistency check itself failed (transport, parse).
    #[error("grounding check failed: {0}")]
    GroundingCheck(#[source] CapabilityError),

    /// Strict grounding mode: every attempt was rejected.
    #[error("optimist statement in round {round} rejected after {attempts} attempts: {}", issues.join("; "))]
    GroundingRejected {
        round: u32,
        attempts: u32,
        issues: Vec<String>,
    },

    /// The debate state machine refused a transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl OracleError {
    /// Whether the error came from an external capability rather than the engine.
    pub fn is_capability_failure(&self) -> bool {
        matches!(self, Self::Capability { .. } | Self::GroundingCheck(_))
    }
}
