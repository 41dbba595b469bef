//! Convergence detection and consensus synthesis.
//!
//! Both are lexicon heuristics over the transcript: plain case-insensitive
//! substring containment, no semantic judgement. Convergence sits behind
//! [`ConvergenceStrategy`] so a stronger scorer can replace it without
//! touching the orchestrator.

use serde::{Deserialize, Serialize};

use super::state::DebateTurn;

/// Maximum agreements kept in a synthesis.
pub const MAX_AGREEMENTS: usize = 5;
/// Maximum disagreements kept in a synthesis.
pub const MAX_DISAGREEMENTS: usize = 3;
/// Dominance ratio one sentiment needs over the other for a directional verdict.
pub const VERDICT_DOMINANCE: f64 = 1.5;

/// Phrase lists driving convergence and synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub agreement: Vec<String>,
    pub disagreement: Vec<String>,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Lexicon {
    /// Lowercase every phrase; matching runs against lowercased text.
    pub fn normalized(self) -> Self {
        let lower = |list: Vec<String>| list.into_iter().map(|p| p.to_lowercase()).collect();
        Self {
            agreement: lower(self.agreement),
            disagreement: lower(self.disagreement),
            positive: lower(self.positive),
            negative: lower(self.negative),
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            agreement: phrases(&[
                "i agree",
                "you're right",
                "fair point",
                "i concede",
                "that makes sense",
                "good point",
                "i accept",
                "converge",
                "consensus",
                "we agree",
                "aligned",
            ]),
            disagreement: phrases(&["however", "but", "concern", "risk", "disagree", "challenge"]),
            positive: phrases(&[
                "growth",
                "strong",
                "opportunity",
                "upside",
                "buy",
                "positive",
                "confident",
            ]),
            negative: phrases(&[
                "risk", "concern", "downside", "sell", "negative", "weak", "challenge",
            ]),
        }
    }
}

/// Whether lowercased `text` contains any of `list`.
fn contains_any(text: &str, list: &[String]) -> bool {
    list.iter().any(|p| text.contains(p.as_str()))
}

/// Number of entries in `list` found in lowercased `text`.
fn count_present(text: &str, list: &[String]) -> usize {
    list.iter().filter(|p| text.contains(p.as_str())).count()
}

/// Result of scoring the transcript for convergence after one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceSignal {
    /// Agreement hits found in the window.
    pub agreement_hits: usize,
    /// Turns inspected.
    pub window: usize,
    /// Whether this check counts toward the convergence streak.
    pub converging: bool,
}

impl ConvergenceSignal {
    pub fn not_converging(window: usize) -> Self {
        Self {
            agreement_hits: 0,
            window,
            converging: false,
        }
    }
}

/// Scores a transcript for mutual agreement.
pub trait ConvergenceStrategy: Send + Sync {
    fn score(&self, transcript: &[DebateTurn]) -> ConvergenceSignal;
}

/// Agreement-lexicon counting over the most recent turns.
///
/// A hit is one (message, phrase) pair where the lowercased message contains
/// the phrase. Fewer than `window` turns never converge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordConvergence {
    pub window: usize,
    pub min_hits: usize,
    pub phrases: Vec<String>,
}

impl KeywordConvergence {
    pub fn new(window: usize, min_hits: usize) -> Self {
        Self {
            window,
            min_hits,
            phrases: Lexicon::default().agreement,
        }
    }

    pub fn with_phrases(mut self, phrases: Vec<String>) -> Self {
        self.phrases = phrases.into_iter().map(|p| p.to_lowercase()).collect();
        self
    }
}

impl Default for KeywordConvergence {
    fn default() -> Self {
        Self::new(4, 2)
    }
}

impl ConvergenceStrategy for KeywordConvergence {
    fn score(&self, transcript: &[DebateTurn]) -> ConvergenceSignal {
        if transcript.len() < self.window {
            return ConvergenceSignal::not_converging(transcript.len());
        }

        let recent = &transcript[transcript.len() - self.window..];
        let agreement_hits = recent
            .iter()
            .map(|t| count_present(&t.message.to_lowercase(), &self.phrases))
            .sum();

        ConvergenceSignal {
            agreement_hits,
            window: self.window,
            converging: agreement_hits >= self.min_hits,
        }
    }
}

/// Investment verdict distilled from the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Cautious Buy")]
    CautiousBuy,
    #[serde(rename = "Hold")]
    Hold,
    #[serde(rename = "Cautious Sell")]
    CautiousSell,
    #[serde(rename = "Sell")]
    Sell,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::CautiousBuy => write!(f, "Cautious Buy"),
            Self::Hold => write!(f, "Hold"),
            Self::CautiousSell => write!(f, "Cautious Sell"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// High iff converged with no disagreements, Medium iff converged, else Low.
    pub fn assess(converged: bool, disagreements: usize) -> Self {
        match (converged, disagreements) {
            (true, 0) => Self::High,
            (true, _) => Self::Medium,
            (false, _) => Self::Low,
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Synthesized outcome of a finished debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusReport {
    pub summary: String,
    pub agreements: Vec<String>,
    pub disagreements: Vec<String>,
    pub verdict: Verdict,
    pub confidence: ConfidenceLevel,
}

/// First sentence (split on '.') of `message` containing any of `list`.
fn matching_sentence(message: &str, list: &[String]) -> Option<String> {
    message
        .split('.')
        .find(|s| contains_any(&s.to_lowercase(), list))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn push_unique(out: &mut Vec<String>, item: String) {
    if !out.contains(&item) {
        out.push(item);
    }
}

/// One agreement sentence per turn that hits the agreement lexicon.
pub fn extract_agreements(transcript: &[DebateTurn], lexicon: &Lexicon) -> Vec<String> {
    let mut out = Vec::new();
    for turn in transcript {
        if let Some(sentence) = matching_sentence(&turn.message, &lexicon.agreement) {
            push_unique(&mut out, sentence);
        }
    }
    out.truncate(MAX_AGREEMENTS);
    out
}

/// Disagreement sentences from the final two rounds only.
pub fn extract_disagreements(transcript: &[DebateTurn], lexicon: &Lexicon) -> Vec<String> {
    let Some(last_round) = transcript.last().map(|t| t.round) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for turn in transcript
        .iter()
        .filter(|t| t.round + 1 >= last_round)
    {
        if let Some(sentence) = matching_sentence(&turn.message, &lexicon.disagreement) {
            push_unique(&mut out, sentence);
        }
    }
    out.truncate(MAX_DISAGREEMENTS);
    out
}

/// Positive vs negative lexicon tally over the whole transcript.
///
/// Each lexicon entry counts once if it appears anywhere in the transcript.
pub fn determine_verdict(transcript: &[DebateTurn], converged: bool, lexicon: &Lexicon) -> Verdict {
    let text = transcript
        .iter()
        .map(|t| t.message.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let positive = count_present(&text, &lexicon.positive) as f64;
    let negative = count_present(&text, &lexicon.negative) as f64;

    if positive > negative * VERDICT_DOMINANCE {
        if converged {
            Verdict::Buy
        } else {
            Verdict::CautiousBuy
        }
    } else if negative > positive * VERDICT_DOMINANCE {
        if converged {
            Verdict::Sell
        } else {
            Verdict::CautiousSell
        }
    } else {
        Verdict::Hold
    }
}

fn render_summary(
    total_rounds: u32,
    converged: bool,
    agreements: &[String],
    disagreements: &[String],
    verdict: Verdict,
) -> String {
    let outcome = if converged {
        "reached consensus"
    } else {
        "discussed but did not fully converge"
    };
    let mut summary = format!(
        "After {} rounds of debate, the analysts {}.\n\nKey Points of Agreement:\n",
        total_rounds, outcome
    );
    if agreements.is_empty() {
        summary.push_str("- None recorded\n");
    }
    for a in agreements.iter().take(3) {
        summary.push_str(&format!("- {}\n", a));
    }
    if !disagreements.is_empty() {
        summary.push_str("\nRemaining Concerns:\n");
        for d in disagreements.iter().take(2) {
            summary.push_str(&format!("- {}\n", d));
        }
    }
    summary.push_str(&format!("\nFinal Assessment: {}\n", verdict));
    summary
}

/// Distill agreements, disagreements, verdict, and confidence from a transcript.
pub fn synthesize(
    transcript: &[DebateTurn],
    total_rounds: u32,
    converged: bool,
    lexicon: &Lexicon,
) -> ConsensusReport {
    let agreements = extract_agreements(transcript, lexicon);
    let disagreements = extract_disagreements(transcript, lexicon);
    let verdict = determine_verdict(transcript, converged, lexicon);
    let confidence = ConfidenceLevel::assess(converged, disagreements.len());
    let summary = render_summary(total_rounds, converged, &agreements, &disagreements, verdict);

    ConsensusReport {
        summary,
        agreements,
        disagreements,
        verdict,
        confidence,
    }
}
