//! Debate state machine: phases, transitions, and the session transcript.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Optimist is producing the opening position.
    Opening,
    /// Skeptic has challenged (or is challenging) the opening.
    Challenged,
    /// Optimist is responding in round 2+.
    Responding,
    /// Skeptic is countering in round 2+.
    Countering,
    /// Agreement streak reached the threshold.
    Converged,
    /// Round budget spent without convergence.
    Exhausted,
    /// A capability failed or strict grounding rejected a turn.
    Aborted,
}

impl DebatePhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted | Self::Aborted)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Opening => &[Self::Challenged, Self::Aborted],
            Self::Challenged => &[Self::Responding, Self::Exhausted, Self::Aborted],
            Self::Responding => &[Self::Countering, Self::Converged, Self::Aborted],
            Self::Countering => &[Self::Responding, Self::Exhausted, Self::Aborted],
            Self::Converged | Self::Exhausted | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Challenged => write!(f, "challenged"),
            Self::Responding => write!(f, "responding"),
            Self::Countering => write!(f, "countering"),
            Self::Converged => write!(f, "converged"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Side a participant argues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebateRole {
    Optimist,
    Skeptic,
}

impl DebateRole {
    pub fn opponent(self) -> Self {
        match self {
            Self::Optimist => Self::Skeptic,
            Self::Skeptic => Self::Optimist,
        }
    }
}

impl std::fmt::Display for DebateRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimist => write!(f, "optimist"),
            Self::Skeptic => write!(f, "skeptic"),
        }
    }
}

/// One logged utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateTurn {
    /// Round number (1-indexed).
    pub round: u32,
    /// Name of the agent that spoke.
    pub speaker: String,
    pub role: DebateRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Topic label, e.g. "Round 3 Response".
    pub topic: String,
}

impl DebateTurn {
    pub fn new(
        round: u32,
        speaker: impl Into<String>,
        role: DebateRole,
        message: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            round,
            speaker: speaker.into(),
            role,
            message: message.into(),
            timestamp: Utc::now(),
            topic: topic.into(),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// A debate session tracking phase, transcript, and transition history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: String,
    pub phase: DebatePhase,
    pub current_round: u32,
    pub max_rounds: u32,
    /// Append-only transcript.
    pub turns: Vec<DebateTurn>,
    pub transitions: Vec<DebateTransition>,
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    /// Create a session in the opening phase of round 1.
    pub fn new(id: &str, max_rounds: u32) -> Self {
        Self {
            id: id.to_string(),
            phase: DebatePhase::Opening,
            current_round: 1,
            max_rounds,
            turns: Vec::new(),
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(DebateTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        // Each optimist response opens a new round
        if to == DebatePhase::Responding {
            self.current_round += 1;
        }

        Ok(())
    }

    /// Append a turn to the transcript.
    pub fn record_turn(&mut self, turn: DebateTurn) {
        self.turns.push(turn);
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn has_rounds_remaining(&self) -> bool {
        self.current_round < self.max_rounds
    }

    /// Number of distinct round numbers in the transcript.
    pub fn total_rounds(&self) -> u32 {
        self.turns
            .iter()
            .map(|t| t.round)
            .collect::<BTreeSet<_>>()
            .len() as u32
    }

    pub fn last_message(&self, role: DebateRole) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == role)
            .map(|t| t.message.as_str())
    }

    /// First `chars` characters of each prior turn by `role`, space-joined.
    pub fn digest(&self, role: DebateRole, chars: usize) -> String {
        self.turns
            .iter()
            .filter(|t| t.role == role)
            .map(|t| t.message.chars().take(chars).collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {} turns | debate={}",
            self.phase,
            self.current_round,
            self.max_rounds,
            self.turns.len(),
            self.id
        )
    }
}
