//! Debate orchestrator: drives the optimist/skeptic loop end to end.
//!
//! Ties together the state machine, the grounding-validation retry loop,
//! convergence tracking, and consensus synthesis. Capabilities are injected;
//! the orchestrator never constructs an agent itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::consensus::{
    synthesize, ConfidenceLevel, ConvergenceStrategy, KeywordConvergence, Lexicon, Verdict,
};
use super::guardrails::{ConvergenceTracker, DebateConfig, GuardrailOutcome};
use super::state::{DebatePhase, DebateRole, DebateSession, DebateTransition, DebateTurn};
use crate::capability::{
    CorrectiveFeedback, DebateFacts, DebateStage, PromptContext, ReasoningAgent,
    StatementConsistency,
};
use crate::error::{OracleError, OracleResult};
use crate::financials::FinancialReport;
use crate::simulation::AggregatedSimulation;

/// Terminal artifact of one debate run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateResult {
    pub debate_id: String,
    pub transcript: Vec<DebateTurn>,
    pub transitions: Vec<DebateTransition>,
    /// Distinct round numbers in the transcript.
    pub total_rounds: u32,
    pub converged: bool,
    pub convergence_round: Option<u32>,
    pub consensus_summary: String,
    pub agreements: Vec<String>,
    pub disagreements: Vec<String>,
    pub verdict: Verdict,
    pub confidence: ConfidenceLevel,
    pub terminal_phase: DebatePhase,
}

impl DebateResult {
    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        let status = if self.converged {
            "CONVERGED"
        } else {
            "EXHAUSTED"
        };
        format!(
            "[{}] {} rounds | verdict={} | confidence={} | debate={}",
            status, self.total_rounds, self.verdict, self.confidence, self.debate_id
        )
    }

    pub fn turns_by(&self, role: DebateRole) -> impl Iterator<Item = &DebateTurn> {
        self.transcript.iter().filter(move |t| t.role == role)
    }
}

/// Runs grounded debates between an optimist and a skeptic.
pub struct DebateOrchestrator {
    optimist: Arc<dyn ReasoningAgent>,
    skeptic: Arc<dyn ReasoningAgent>,
    checker: Arc<dyn StatementConsistency>,
    convergence: Option<Arc<dyn ConvergenceStrategy>>,
    lexicon: Lexicon,
    config: DebateConfig,
}

impl DebateOrchestrator {
    pub fn new(
        optimist: Arc<dyn ReasoningAgent>,
        skeptic: Arc<dyn ReasoningAgent>,
        checker: Arc<dyn StatementConsistency>,
    ) -> Self {
        Self {
            optimist,
            skeptic,
            checker,
            convergence: None,
            lexicon: Lexicon::default(),
            config: DebateConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DebateConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the keyword convergence check.
    pub fn with_convergence_strategy(mut self, strategy: Arc<dyn ConvergenceStrategy>) -> Self {
        self.convergence = Some(strategy);
        self
    }

    /// Phrase lists for the default convergence check and for synthesis.
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon.normalized();
        self
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Run a debate with the configured limits.
    pub async fn run_debate(
        &self,
        report: &FinancialReport,
        simulation: &AggregatedSimulation,
    ) -> OracleResult<DebateResult> {
        self.run(&self.config, report, simulation).await
    }

    /// Run a debate overriding the round budget and convergence threshold.
    pub async fn run_debate_with_limits(
        &self,
        report: &FinancialReport,
        simulation: &AggregatedSimulation,
        max_rounds: u32,
        convergence_threshold: u32,
    ) -> OracleResult<DebateResult> {
        let config = self
            .config
            .clone()
            .with_max_rounds(max_rounds)
            .with_convergence_threshold(convergence_threshold);
        self.run(&config, report, simulation).await
    }

    async fn run(
        &self,
        config: &DebateConfig,
        report: &FinancialReport,
        simulation: &AggregatedSimulation,
    ) -> OracleResult<DebateResult> {
        config.validate()?;

        let debate_id = Uuid::new_v4().to_string();
        let mut session = DebateSession::new(&debate_id, config.max_rounds);
        info!(
            debate_id = %debate_id,
            report = %report.label(),
            optimist = %self.optimist.name(),
            skeptic = %self.skeptic.name(),
            max_rounds = config.max_rounds,
            threshold = config.convergence_threshold,
            strict = config.strict_grounding,
            "Starting debate"
        );

        let outcome = match self.drive(config, &mut session, report, simulation).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = err.to_string();
                if session.transition(DebatePhase::Aborted, &reason).is_ok() {
                    warn!(status = %session.status_line(), "Debate aborted: {}", reason);
                }
                return Err(err);
            }
        };

        let (converged, convergence_round) = match outcome {
            GuardrailOutcome::Converged { round, .. } => (true, Some(round)),
            _ => (false, None),
        };
        let total_rounds = session.total_rounds();
        let consensus = synthesize(&session.turns, total_rounds, converged, &self.lexicon);

        info!(
            debate_id = %debate_id,
            outcome = %outcome,
            total_rounds,
            verdict = %consensus.verdict,
            confidence = %consensus.confidence,
            "Debate complete"
        );

        Ok(DebateResult {
            debate_id,
            transcript: session.turns,
            transitions: session.transitions,
            total_rounds,
            converged,
            convergence_round,
            consensus_summary: consensus.summary,
            agreements: consensus.agreements,
            disagreements: consensus.disagreements,
            verdict: consensus.verdict,
            confidence: consensus.confidence,
            terminal_phase: session.phase,
        })
    }

    async fn drive(
        &self,
        config: &DebateConfig,
        session: &mut DebateSession,
        report: &FinancialReport,
        simulation: &AggregatedSimulation,
    ) -> OracleResult<GuardrailOutcome> {
        let facts = DebateFacts::new(report, simulation);
        let strategy: Arc<dyn ConvergenceStrategy> = match &self.convergence {
            Some(strategy) => Arc::clone(strategy),
            None => Arc::new(
                KeywordConvergence::new(config.convergence_window, config.min_agreement_hits)
                    .with_phrases(self.lexicon.agreement.clone()),
            ),
        };
        let mut tracker = ConvergenceTracker::new(config.convergence_threshold);

        // Round 1: opening and challenge
        let ctx = PromptContext::new(DebateStage::Opening, 1, facts.clone());
        let opening = self
            .grounded_optimist_turn(config, ctx, report, simulation)
            .await?;
        self.record(session, DebateStage::Opening, 1, opening.clone());
        session.transition(DebatePhase::Challenged, "opening recorded")?;

        let ctx =
            PromptContext::new(DebateStage::Challenge, 1, facts.clone()).with_opponent_message(opening);
        let challenge = self.skeptic_turn(&ctx).await?;
        self.record(session, DebateStage::Challenge, 1, challenge);

        while session.has_rounds_remaining() {
            session.transition(DebatePhase::Responding, "skeptic replied")?;
            let round = session.current_round;
            info!(round, max_rounds = config.max_rounds, "Debate round");

            let ctx = PromptContext::new(DebateStage::Response, round, facts.clone())
                .with_opponent_message(
                    session
                        .last_message(DebateRole::Skeptic)
                        .unwrap_or_default(),
                )
                .with_digest(session.digest(DebateRole::Optimist, config.digest_chars));
            let response = self
                .grounded_optimist_turn(config, ctx, report, simulation)
                .await?;
            self.record(session, DebateStage::Response, round, response.clone());

            // Convergence is only checked after the optimist speaks
            let signal = strategy.score(&session.turns);
            debug!(
                round,
                hits = signal.agreement_hits,
                converging = signal.converging,
                "Convergence check"
            );
            let outcome = tracker.observe(round, &signal);
            if outcome.should_stop() {
                session.transition(DebatePhase::Converged, &outcome.to_string())?;
                return Ok(outcome);
            }
            session.transition(DebatePhase::Countering, "no convergence yet")?;

            let ctx = PromptContext::new(DebateStage::Counter, round, facts.clone())
                .with_opponent_message(response)
                .with_digest(session.digest(DebateRole::Skeptic, config.digest_chars));
            let counter = self.skeptic_turn(&ctx).await?;
            self.record(session, DebateStage::Counter, round, counter);
        }

        let outcome = GuardrailOutcome::Exhausted {
            rounds: session.current_round,
        };
        session.transition(DebatePhase::Exhausted, &outcome.to_string())?;
        Ok(outcome)
    }

    /// Ask the optimist for a turn, re-prompting with corrective feedback
    /// until the consistency check accepts it or attempts run out.
    async fn grounded_optimist_turn(
        &self,
        config: &DebateConfig,
        mut ctx: PromptContext,
        report: &FinancialReport,
        simulation: &AggregatedSimulation,
    ) -> OracleResult<String> {
        let round = ctx.round;
        let mut rejected = None;

        for attempt in 1..=config.validation_attempts {
            let text = self
                .optimist
                .respond(&ctx)
                .await
                .map_err(|source| OracleError::Capability {
                    role: DebateRole::Optimist,
                    source,
                })?;
            let verdict = self
                .checker
                .validate_statement(&text, report, simulation)
                .await
                .map_err(OracleError::GroundingCheck)?;

            if verdict.is_valid {
                debug!(round, attempt, "Optimist statement grounded");
                return Ok(text);
            }

            warn!(
                round,
                attempt,
                max_attempts = config.validation_attempts,
                "Optimist statement rejected: {}",
                verdict.issues.join("; ")
            );
            ctx.corrective_feedback.push(CorrectiveFeedback {
                attempt,
                issues: verdict.issues.clone(),
                feedback: verdict.feedback,
            });
            rejected = Some((text, verdict.issues));
        }

        let Some((text, issues)) = rejected else {
            return Err(OracleError::InvalidInput(
                "validation_attempts must be at least 1".to_string(),
            ));
        };

        if config.strict_grounding {
            return Err(OracleError::GroundingRejected {
                round,
                attempts: config.validation_attempts,
                issues,
            });
        }

        warn!(
            round,
            attempts = config.validation_attempts,
            "Accepting ungrounded optimist statement (best effort)"
        );
        Ok(text)
    }

    async fn skeptic_turn(&self, ctx: &PromptContext) -> OracleResult<String> {
        self.skeptic
            .respond(ctx)
            .await
            .map_err(|source| OracleError::Capability {
                role: DebateRole::Skeptic,
                source,
            })
    }

    fn record(&self, session: &mut DebateSession, stage: DebateStage, round: u32, message: String) {
        let speaker = match stage.role() {
            DebateRole::Optimist => self.optimist.name(),
            DebateRole::Skeptic => self.skeptic.name(),
        };
        session.record_turn(DebateTurn::new(
            round,
            speaker,
            stage.role(),
            message,
            stage.topic(round),
        ));
    }
}
