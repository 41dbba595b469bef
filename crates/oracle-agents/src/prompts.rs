//! Prompt templates for the optimist, skeptic, and grounding check.
//!
//! Every debate prompt anchors the speaker in the gap between the historical
//! statement and the counterfactual simulation. Rejected optimist attempts
//! carry their grounding feedback forward so the rewrite sees every prior
//! rejection in order.

use oracle_engine::{format_usd, DebateFacts, DebateStage, PromptContext};
use std::fmt::Write;

/// Bump when any template changes wording.
pub const PROMPT_VERSION: &str = "2.1.0";

pub const OPTIMIST_PERSONA: &str = r#"You are an OPTIMISTIC financial analyst. Your role is to:
- Highlight growth opportunities and upside potential based ONLY on the provided data
- Support revenue and margin assumptions with evidence from the report
- Be constructive but acknowledge valid risks when presented
- Use data-driven arguments to defend your position

STRICT RULES:
1. NO HALLUCINATIONS: Do NOT invent "new products", "market expansion", "pre-orders", or "internal projections".
2. CITE SOURCES: You must cite specific numbers (e.g., "Revenue of $119B") to support claims.
3. RESPECT MATH: If the simulation shows flat growth, do not argue for acceleration.

Keep responses concise (2-3 paragraphs max) and professional."#;

pub const SKEPTIC_PERSONA: &str = r#"You are a SKEPTICAL financial analyst. Your role is to:
- Challenge assumptions and identify risks
- Question growth projections and valuation methods
- Point out potential downside scenarios
- Demand evidence for optimistic claims
- Call out any "hallucinated" drivers (e.g., if the optimist mentions a product not in the report)

STRICT RULES:
1. FACT CHECK: If the optimist claims "margin expansion", check the OpEx delta. If it's positive, call them out.
2. DEMAND PROOF: Ask "Where in the report is this?" for any vague claim.

Keep responses concise (2-3 paragraphs max) and professional."#;

const ANCHORING_HEADER: &str = "**CRITICAL INSTRUCTION - COUNTERFACTUAL ANCHORING:**";

/// Render the full prompt for a debate turn.
pub fn render(ctx: &PromptContext) -> String {
    let mut prompt = match ctx.stage {
        DebateStage::Opening => opening(&ctx.facts),
        DebateStage::Challenge => challenge(ctx),
        DebateStage::Response => response(ctx),
        DebateStage::Counter => counter(ctx),
    };
    for rejection in &ctx.corrective_feedback {
        let _ = write!(
            prompt,
            "\n\n[SYSTEM FEEDBACK]: Your previous response was rejected. Issues: {}. \nFeedback: {}\n\nPlease rewrite strictly adhering to the data.",
            rejection.issues.join("; "),
            rejection.feedback
        );
    }
    prompt
}

fn opening(facts: &DebateFacts) -> String {
    format!(
        r#"{persona}

You are analyzing a COUNTERFACTUAL SIMULATION of {company} - a parallel universe scenario based on real financial data.

HISTORICAL REALITY (from the filed report):
- Current Revenue: {revenue}
- Current OpEx: {opex}
- Current EBITDA: {ebitda}

COUNTERFACTUAL SIMULATION RESULTS:
- Median NPV: {npv} (P10 {p10}, P90 {p90})
- Median Revenue: {sim_revenue}
- Median EBITDA: {sim_ebitda}
- Median Free Cash Flow: {sim_fcf}

SIMULATION ASSUMPTIONS:
{assumptions}

ROUND 1: OPENING POSITION

{anchoring}
You MUST anchor your arguments in the DIFFERENCES between historical reality and the counterfactual simulation.

For example:
- "While historical revenue was {revenue}, the counterfactual projects {sim_revenue} because [explain the delta assumptions]"
- "The NPV of {npv} reflects counterfactual assumptions about [discount rate/growth/efficiency] that differ from historical patterns"

Present your optimistic analysis of this COUNTERFACTUAL scenario. Focus on:
1. Why the counterfactual NPV is reasonable given the simulation parameters
2. How the counterfactual differs from historical reality and why
3. What assumptions in the counterfactual drive the projected outcomes

Be specific and reference the numbers above. DO NOT invent data not shown here.
"#,
        persona = OPTIMIST_PERSONA,
        company = facts.company,
        revenue = format_usd(facts.historical_revenue),
        opex = format_usd(facts.historical_opex),
        ebitda = format_usd(facts.historical_ebitda),
        npv = format_usd(facts.median_npv),
        p10 = format_usd(facts.p10_npv),
        p90 = format_usd(facts.p90_npv),
        sim_revenue = format_usd(facts.median_revenue),
        sim_ebitda = format_usd(facts.median_ebitda),
        sim_fcf = format_usd(facts.median_fcf),
        assumptions = bullet_list(&facts.assumptions),
        anchoring = ANCHORING_HEADER,
    )
}

fn challenge(ctx: &PromptContext) -> String {
    let facts = &ctx.facts;
    format!(
        r#"{persona}

You just heard this optimistic analysis of a COUNTERFACTUAL SIMULATION of {company}:

"{position}"

HISTORICAL REALITY (from the filed report):
- Current Revenue: {revenue}
- Current OpEx: {opex}
- Current OpEx/Revenue: {ratio}

COUNTERFACTUAL SIMULATION:
- Median NPV: {npv} (P10 {p10}, P90 {p90})
- Median Revenue: {sim_revenue}

SIMULATION ASSUMPTIONS:
{assumptions}

ROUND 1: CHALLENGE

{anchoring}
You MUST challenge the optimist by comparing the counterfactual assumptions to historical reality.

For example:
- "The counterfactual assumes [X], but historical data shows [Y]. This delta of [Z] is not justified because..."
- "The NPV inflation appears driven by [assumption], which contradicts the historical pattern of [pattern]"

Challenge the optimistic view. Focus on:
1. What counterfactual assumptions contradict historical patterns from the report?
2. Are the simulation deltas (growth, OpEx, discount rate) realistic given the historical baseline?
3. What evidence from the report contradicts the counterfactual optimism?

Be specific and reference concrete concerns. Demand evidence for any claim not grounded in the data.
"#,
        persona = SKEPTIC_PERSONA,
        company = facts.company,
        position = ctx.opponent_message.as_deref().unwrap_or_default(),
        revenue = format_usd(facts.historical_revenue),
        opex = format_usd(facts.historical_opex),
        ratio = percent(facts.opex_ratio),
        npv = format_usd(facts.median_npv),
        p10 = format_usd(facts.p10_npv),
        p90 = format_usd(facts.p90_npv),
        sim_revenue = format_usd(facts.median_revenue),
        assumptions = bullet_list(&facts.assumptions),
        anchoring = ANCHORING_HEADER,
    )
}

fn response(ctx: &PromptContext) -> String {
    format!(
        r#"{persona}

ROUND {round}: RESPONSE

Your previous statements: {digest}

The skeptic just challenged you with:
"{challenge}"

{figures}

{anchoring}
Continue to anchor your response in the differences between historical reality and the counterfactual simulation.

Respond to their concerns:
1. Address the specific risks they raised about counterfactual assumptions
2. Explain WHY the counterfactual differs from historical patterns (e.g., "The simulation assumes lower discount rates because...")
3. Provide counter-evidence or concede valid points

If you agree with their points, say so explicitly. If you disagree, explain why with evidence from the data provided.
"#,
        persona = OPTIMIST_PERSONA,
        round = ctx.round,
        digest = ctx.digest.as_deref().unwrap_or_default(),
        challenge = ctx.opponent_message.as_deref().unwrap_or_default(),
        figures = figures_on_record(&ctx.facts),
        anchoring = ANCHORING_HEADER,
    )
}

fn counter(ctx: &PromptContext) -> String {
    format!(
        r#"{persona}

ROUND {round}: COUNTER-ARGUMENT

Your previous challenges: {digest}

The optimist responded with:
"{reply}"

{figures}

{anchoring}
Continue to anchor your critique in the differences between historical reality and the counterfactual simulation.

Continue the analysis:
1. Evaluate their response - did they justify WHY the counterfactual differs from historical patterns?
2. Raise new concerns or dig deeper into counterfactual assumptions that seem unrealistic
3. State areas where you've found common ground

If they've convinced you on certain points, acknowledge it. Otherwise, press further on the counterfactual logic.
"#,
        persona = SKEPTIC_PERSONA,
        round = ctx.round,
        digest = ctx.digest.as_deref().unwrap_or_default(),
        reply = ctx.opponent_message.as_deref().unwrap_or_default(),
        figures = figures_on_record(&ctx.facts),
        anchoring = ANCHORING_HEADER,
    )
}

/// Compact reminder of the citable numbers for rounds 2+.
fn figures_on_record(facts: &DebateFacts) -> String {
    format!(
        "FIGURES ON RECORD:\n- Historical Revenue {} / OpEx {} / EBITDA {}\n- Simulated median Revenue {} / EBITDA {} / NPV {}",
        format_usd(facts.historical_revenue),
        format_usd(facts.historical_opex),
        format_usd(facts.historical_ebitda),
        format_usd(facts.median_revenue),
        format_usd(facts.median_ebitda),
        format_usd(facts.median_npv),
    )
}

/// Prompt asking a model to check one optimist statement against the data.
///
/// The reply format is parsed by [`crate::agents::grounding::parse_grounding_reply`].
pub fn grounding_prompt(statement: &str, facts: &DebateFacts) -> String {
    format!(
        r#"You are a financial realism validator. Check whether the analyst statement below is grounded in the data provided. Nothing else counts as evidence.

DATA FOR {company}:
- Historical Revenue: {revenue}
- Historical OpEx: {opex}
- Historical EBITDA: {ebitda}
- Historical OpEx/Revenue: {ratio}
- Simulated Median Revenue: {sim_revenue}
- Simulated Median EBITDA: {sim_ebitda}
- Simulated Median Free Cash Flow: {sim_fcf}
- Simulated NPV: median {npv}, P10 {p10}, P90 {p90}

SIMULATION ASSUMPTIONS:
{assumptions}

STATEMENT:
"{statement}"

Mark the statement INVALID if it:
1. Cites a number that does not match the data (beyond rounding)
2. Invents drivers absent from the data (new products, market expansion, pre-orders, internal projections)
3. Argues for a trend the simulation does not show

Reply in exactly this format:
VERDICT: VALID or INVALID
ISSUES: <semicolon-separated list of problems, or NONE>
FEEDBACK: <one short paragraph telling the analyst how to fix the statement>
"#,
        company = facts.company,
        revenue = format_usd(facts.historical_revenue),
        opex = format_usd(facts.historical_opex),
        ebitda = format_usd(facts.historical_ebitda),
        ratio = percent(facts.opex_ratio),
        sim_revenue = format_usd(facts.median_revenue),
        sim_ebitda = format_usd(facts.median_ebitda),
        sim_fcf = format_usd(facts.median_fcf),
        npv = format_usd(facts.median_npv),
        p10 = format_usd(facts.p10_npv),
        p90 = format_usd(facts.p90_npv),
        assumptions = bullet_list(&facts.assumptions),
        statement = statement,
    )
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none recorded)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn percent(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "n/a".to_string(),
    }
}
