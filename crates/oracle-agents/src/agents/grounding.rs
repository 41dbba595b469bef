use async_trait::async_trait;
use oracle_engine::{
    AggregatedSimulation, CapabilityError, DebateFacts, FinancialReport, GroundingVerdict,
    StatementConsistency,
};
use std::sync::Arc;
use tracing::debug;

use super::LanguageModel;
use crate::prompts;

/// Statement consistency backed by a language model.
///
/// Fail-closed: a reply without a recognizable verdict rejects the statement.
pub struct LlmGroundingChecker {
    model: Arc<dyn LanguageModel>,
}

impl LlmGroundingChecker {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl StatementConsistency for LlmGroundingChecker {
    async fn validate_statement(
        &self,
        text: &str,
        report: &FinancialReport,
        simulation: &AggregatedSimulation,
    ) -> Result<GroundingVerdict, CapabilityError> {
        let facts = DebateFacts::new(report, simulation);
        let reply = self
            .model
            .complete(&prompts::grounding_prompt(text, &facts))
            .await?;
        let verdict = parse_grounding_reply(&reply);
        debug!(
            checker = %self.model.name(),
            valid = verdict.is_valid,
            issues = verdict.issues.len(),
            "grounding verdict"
        );
        Ok(verdict)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Issues,
    Feedback,
}

/// Parse a `VERDICT:` / `ISSUES:` / `FEEDBACK:` reply.
///
/// Accepts a JSON object with `is_valid`/`issues`/`feedback` as well, tolerates
/// markdown emphasis and bullet lists, and treats a reply with no verdict as
/// invalid with the raw text as feedback.
pub fn parse_grounding_reply(raw: &str) -> GroundingVerdict {
    if let Some(verdict) = extract_json_block(raw)
        .and_then(|json| serde_json::from_str::<GroundingVerdict>(json).ok())
    {
        return verdict;
    }

    let mut is_valid = None;
    let mut issues = Vec::new();
    let mut feedback_lines: Vec<&str> = Vec::new();
    let mut section = Section::None;

    for line in raw.lines() {
        let cleaned = line.trim().trim_matches(|c: char| c == '*' || c == '#').trim();
        let upper = cleaned.to_ascii_uppercase();

        if let Some(rest) = strip_label(cleaned, &upper, "VERDICT:") {
            let value = rest.to_ascii_uppercase();
            if value.contains("INVALID") || value.contains("NOT VALID") {
                is_valid = Some(false);
            } else if value.contains("VALID") {
                is_valid = Some(true);
            }
            section = Section::None;
        } else if let Some(rest) = strip_label(cleaned, &upper, "ISSUES:") {
            push_issues(&mut issues, rest);
            section = Section::Issues;
        } else if let Some(rest) = strip_label(cleaned, &upper, "FEEDBACK:") {
            if !rest.is_empty() {
                feedback_lines.push(rest);
            }
            section = Section::Feedback;
        } else if !cleaned.is_empty() {
            match section {
                Section::Issues => push_issues(&mut issues, cleaned),
                Section::Feedback => feedback_lines.push(cleaned),
                Section::None => {}
            }
        }
    }

    match is_valid {
        Some(true) => GroundingVerdict {
            is_valid: true,
            issues,
            feedback: feedback_lines.join(" "),
        },
        Some(false) => {
            if issues.is_empty() {
                issues.push("Statement is not supported by the provided data".to_string());
            }
            GroundingVerdict::invalid(issues, feedback_lines.join(" "))
        }
        None => GroundingVerdict::invalid(
            vec!["Grounding reply had no recognizable verdict".to_string()],
            raw.trim(),
        ),
    }
}

fn strip_label<'a>(cleaned: &'a str, upper: &str, label: &str) -> Option<&'a str> {
    if upper.starts_with(label) {
        Some(cleaned[label.len()..].trim().trim_matches('*').trim())
    } else {
        None
    }
}

fn push_issues(issues: &mut Vec<String>, text: &str) {
    for part in text.split(';') {
        let item = part.trim().trim_start_matches(['-', '•']).trim();
        let upper = item.to_ascii_uppercase();
        if item.is_empty() || upper == "NONE" || upper == "N/A" || upper == "NONE." {
            continue;
        }
        issues.push(item.to_string());
    }
}

/// First `{ ... }` span in the text, if any.
fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
