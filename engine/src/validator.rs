//! Financial sanity validator: stateless rule checks over statements and scenarios.
//!
//! Every check returns a list of [`ValidationIssue`]s; an empty list means
//! clean. Nothing here aborts a run: callers decide what an `Error`-level
//! issue means for them.

use serde::{Deserialize, Serialize};

use crate::financials::{
    bps_to_decimal, format_usd, BalanceSheet, FinancialReport, IncomeStatement, ScenarioParams,
};
use crate::valuation::BASELINE_DISCOUNT_RATE;

/// Dollar tolerance for accounting identities.
pub const BALANCE_TOLERANCE: f64 = 1.0;

/// Absolute bps delta at or above which a scenario input is flagged.
pub const VERY_LARGE_DELTA_BPS: i64 = 10_000;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A single finding from the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    pub severity: Severity,
    /// Field the issue refers to (e.g. `income_statement.OpEx`).
    pub field: String,
}

impl ValidationIssue {
    pub fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
            field: field.to_string(),
        }
    }

    pub fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            field: field.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.field, self.message)
    }
}

/// Outcome of the Assets = Liabilities + Equity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub is_balanced: bool,
    /// Assets − (Liabilities + Equity).
    pub difference: f64,
    pub total_assets: f64,
    pub total_liabilities_and_equity: f64,
}

/// Recompute totals and compare both sides of the balance sheet.
pub fn check_balance_sheet(bs: &BalanceSheet) -> BalanceCheck {
    let total_assets = bs.total_assets();
    let total_liabilities_and_equity = bs.total_liabilities() + bs.total_equity();
    let difference = total_assets - total_liabilities_and_equity;
    BalanceCheck {
        is_balanced: difference.abs() < BALANCE_TOLERANCE,
        difference,
        total_assets,
        total_liabilities_and_equity,
    }
}

/// Check an income statement for implausible or inconsistent values.
pub fn validate_income_statement(stmt: &IncomeStatement) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if stmt.revenue <= 0.0 {
        issues.push(ValidationIssue::error(
            "income_statement.Revenue",
            format!("Revenue must be positive, got {}", format_usd(stmt.revenue)),
        ));
    }

    if stmt.opex > stmt.revenue {
        issues.push(ValidationIssue::error(
            "income_statement.OpEx",
            format!(
                "Operating expenses ({}) exceed revenue ({})",
                format_usd(stmt.opex),
                format_usd(stmt.revenue)
            ),
        ));
    }

    if stmt.gross_profit < 0.0 {
        issues.push(ValidationIssue::warning(
            "income_statement.GrossProfit",
            format!(
                "Negative gross margin: gross profit is {}",
                format_usd(stmt.gross_profit)
            ),
        ));
    }

    let margins = [
        ("income_statement.GrossProfit", "Gross margin", stmt.gross_margin()),
        ("income_statement.EBITDA", "EBITDA margin", stmt.ebitda_margin()),
        ("income_statement.NetIncome", "Net margin", stmt.net_margin()),
    ];
    for (field, label, margin) in margins {
        if let Some(m) = margin.filter(|m| *m > 1.0) {
            issues.push(ValidationIssue::warning(
                field,
                format!("{} of {:.1}% exceeds 100%", label, m * 100.0),
            ));
        }
    }

    let expected_gp = stmt.revenue - stmt.cost_of_goods_sold;
    if (stmt.gross_profit - expected_gp).abs() >= BALANCE_TOLERANCE {
        issues.push(ValidationIssue::warning(
            "income_statement.GrossProfit",
            format!(
                "Gross profit {} does not equal revenue minus COGS ({})",
                format_usd(stmt.gross_profit),
                format_usd(expected_gp)
            ),
        ));
    }

    let expected_ebitda = stmt.gross_profit - stmt.opex;
    if (stmt.ebitda - expected_ebitda).abs() >= BALANCE_TOLERANCE {
        issues.push(ValidationIssue::warning(
            "income_statement.EBITDA",
            format!(
                "EBITDA {} does not equal gross profit minus OpEx ({})",
                format_usd(stmt.ebitda),
                format_usd(expected_ebitda)
            ),
        ));
    }

    issues
}

/// Check that Assets ≈ Liabilities + Equity.
pub fn validate_balance_sheet(bs: &BalanceSheet) -> Vec<ValidationIssue> {
    let check = check_balance_sheet(bs);
    if check.is_balanced {
        return Vec::new();
    }
    vec![ValidationIssue::warning(
        "balance_sheet",
        format!(
            "Balance sheet doesn't balance: assets {} vs liabilities + equity {} (difference {:.2})",
            format_usd(check.total_assets),
            format_usd(check.total_liabilities_and_equity),
            check.difference
        ),
    )]
}

/// Check raw scenario deltas for extreme or numerically invalid values.
pub fn validate_scenario_params(
    opex_delta_bps: i64,
    rev_growth_bps: i64,
    discount_rate_bps: i64,
) -> Vec<ValidationIssue> {
    scenario_param_issues(
        BASELINE_DISCOUNT_RATE,
        opex_delta_bps,
        rev_growth_bps,
        discount_rate_bps,
    )
}

fn scenario_param_issues(
    baseline_discount_rate: f64,
    opex_delta_bps: i64,
    rev_growth_bps: i64,
    discount_rate_bps: i64,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    flag_very_large(&mut issues, "scenario.opex_delta_bps", "OpEx delta", opex_delta_bps);
    flag_very_large(
        &mut issues,
        "scenario.revenue_growth_bps",
        "Revenue growth delta",
        rev_growth_bps,
    );
    flag_very_large(
        &mut issues,
        "scenario.discount_rate_bps",
        "Discount rate delta",
        discount_rate_bps,
    );

    let effective = baseline_discount_rate + bps_to_decimal(discount_rate_bps);
    if effective < 0.0 {
        issues.push(ValidationIssue::error(
            "scenario.discount_rate_bps",
            format!(
                "Discount rate delta of {} bps makes the effective discount rate negative ({:.2}%)",
                discount_rate_bps,
                effective * 100.0
            ),
        ));
    }

    issues
}

/// Scenario checks including the tax-rate delta.
pub fn validate_scenario(scenario: &ScenarioParams) -> Vec<ValidationIssue> {
    validate_scenario_at(scenario, BASELINE_DISCOUNT_RATE)
}

/// [`validate_scenario`] against a non-default baseline discount rate.
pub fn validate_scenario_at(
    scenario: &ScenarioParams,
    baseline_discount_rate: f64,
) -> Vec<ValidationIssue> {
    let mut issues = scenario_param_issues(
        baseline_discount_rate,
        scenario.opex_delta_bps,
        scenario.revenue_growth_bps,
        scenario.discount_rate_bps,
    );
    flag_very_large(
        &mut issues,
        "scenario.tax_rate_delta_bps",
        "Tax rate delta",
        scenario.tax_rate_delta_bps,
    );
    issues
}

/// Pre-flight checks over a whole report.
pub fn validate_report(report: &FinancialReport) -> Vec<ValidationIssue> {
    let mut issues = validate_income_statement(&report.income_statement);
    issues.extend(validate_balance_sheet(&report.balance_sheet));

    let tax_rate = report.tax_rate();
    if !(0.0..1.0).contains(&tax_rate) {
        issues.push(ValidationIssue::warning(
            "kpis.TaxRate",
            format!("Tax rate of {:.1}% is outside [0%, 100%)", tax_rate * 100.0),
        ));
    }

    issues
}

fn flag_very_large(issues: &mut Vec<ValidationIssue>, field: &str, label: &str, bps: i64) {
    if bps.unsigned_abs() >= VERY_LARGE_DELTA_BPS.unsigned_abs() {
        issues.push(ValidationIssue::warning(
            field,
            format!(
                "{} of {} bps is very large ({:.0}% relative change)",
                label,
                bps,
                bps_to_decimal(bps) * 100.0
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::financials::fixtures::stable_tech;

    fn statement(revenue: f64, cogs: f64, opex: f64) -> IncomeStatement {
        let gross_profit = revenue - cogs;
        let ebitda = gross_profit - opex;
        IncomeStatement {
            revenue,
            cost_of_goods_sold: cogs,
            gross_profit,
            opex,
            ebitda,
            depreciation_and_amortization: 0.0,
            ebit: ebitda,
            interest_expense: 0.0,
            taxes: 0.0,
            net_income: ebitda,
        }
    }

    fn sheet(assets: f64, liabilities: f64, equity: f64) -> BalanceSheet {
        BalanceSheet {
            assets: BTreeMap::from([("TotalAssets".to_string(), assets)]),
            liabilities: BTreeMap::from([("TotalLiabilities".to_string(), liabilities)]),
            equity: BTreeMap::from([("TotalEquity".to_string(), equity)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_statement_has_no_issues() {
        assert!(validate_income_statement(&stable_tech().income_statement).is_empty());
        assert!(validate_report(&stable_tech()).is_empty());
    }

    #[test]
    fn test_opex_exceeds_revenue() {
        let issues = validate_income_statement(&statement(100_000.0, 40_000.0, 150_000.0));
        let issue = issues
            .iter()
            .find(|i| i.message.to_lowercase().contains("exceed revenue"))
            .unwrap();
        assert!(issue.is_error());
        assert_eq!(issue.field, "income_statement.OpEx");
    }

    #[test]
    fn test_negative_gross_margin() {
        let issues = validate_income_statement(&statement(100_000.0, 120_000.0, 10_000.0));
        assert!(issues
            .iter()
            .any(|i| i.message.contains("Negative gross margin")));
    }

    #[test]
    fn test_margin_over_100_percent() {
        let issues = validate_income_statement(&statement(100_000.0, -20_000.0, 10_000.0));
        assert!(issues.iter().any(|i| i.message.contains("exceeds 100%")));
    }

    #[test]
    fn test_inconsistent_subtotals_are_warnings() {
        let mut stmt = statement(100_000.0, 40_000.0, 30_000.0);
        stmt.gross_profit = 65_000.0;
        let issues = validate_income_statement(&stmt);
        assert!(issues
            .iter()
            .any(|i| i.message.contains("does not equal revenue minus COGS")));
        assert!(issues.iter().all(|i| !i.is_error()));
    }

    #[test]
    fn test_non_positive_revenue_is_error() {
        let issues = validate_income_statement(&statement(0.0, 0.0, 0.0));
        assert!(issues
            .iter()
            .any(|i| i.is_error() && i.field == "income_statement.Revenue"));
    }

    #[test]
    fn test_balance_check_balanced() {
        let check = check_balance_sheet(&sheet(100.0, 40.0, 60.0));
        assert!(check.is_balanced);
        assert_eq!(check.difference, 0.0);
        assert!(validate_balance_sheet(&sheet(100.0, 40.0, 60.0)).is_empty());
    }

    #[test]
    fn test_balance_check_imbalanced() {
        let check = check_balance_sheet(&sheet(100.0, 40.0, 50.0));
        assert!(!check.is_balanced);
        assert_eq!(check.difference, 10.0);
        assert_eq!(check.total_liabilities_and_equity, 90.0);

        let issues = validate_balance_sheet(&sheet(100_000.0, 40_000.0, 50_000.0));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("doesn't balance"));
        assert!(issues[0].message.contains("10000.00"));
    }

    #[test]
    fn test_balance_within_tolerance() {
        assert!(check_balance_sheet(&sheet(100.5, 40.0, 60.0)).is_balanced);
    }

    #[test]
    fn test_balance_recomputed_from_categories() {
        let bs = BalanceSheet {
            assets: BTreeMap::from([("Cash".to_string(), 30.0), ("Inventory".to_string(), 70.0)]),
            liabilities: BTreeMap::from([("Debt".to_string(), 40.0)]),
            equity: BTreeMap::from([("Common".to_string(), 50.0)]),
            ..Default::default()
        };
        let check = check_balance_sheet(&bs);
        assert_eq!(check.total_assets, 100.0);
        assert_eq!(check.difference, 10.0);
    }

    #[test]
    fn test_extreme_scenario_params() {
        let issues = validate_scenario_params(10_000, 10_000, 0);
        assert_eq!(
            issues
                .iter()
                .filter(|i| i.message.contains("very large"))
                .count(),
            2
        );
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn test_negative_discount_rate() {
        let issues = validate_scenario_params(0, 0, -1_000);
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.message.to_lowercase().contains("negative")));
    }

    #[test]
    fn test_discount_rate_at_zero_is_not_negative() {
        assert!(validate_scenario_params(0, 0, -800).is_empty());
    }

    #[test]
    fn test_extreme_i64_delta_is_flagged() {
        let issues = validate_scenario_params(i64::MIN, i64::MAX, 0);
        assert_eq!(
            issues
                .iter()
                .filter(|i| i.message.contains("very large"))
                .count(),
            2
        );
    }

    #[test]
    fn test_negative_rate_uses_given_baseline() {
        let scenario = ScenarioParams::baseline().with_discount_rate_bps(-900);
        // 12% - 9% stays positive
        assert!(validate_scenario_at(&scenario, 0.12).is_empty());
        assert!(validate_scenario(&scenario)
            .iter()
            .any(|i| i.is_error() && i.message.contains("negative")));

        let scenario = ScenarioParams::baseline().with_discount_rate_bps(-300);
        let issues = validate_scenario_at(&scenario, 0.02);
        assert!(issues.iter().any(|i| i.is_error() && i.message.contains("-1.00%")));
    }

    #[test]
    fn test_validate_scenario_checks_tax_delta() {
        let scenario = ScenarioParams::baseline().with_tax_rate_delta_bps(-12_000);
        let issues = validate_scenario(&scenario);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "scenario.tax_rate_delta_bps");
    }

    #[test]
    fn test_report_flags_out_of_range_tax_rate() {
        let mut report = stable_tech();
        report.kpis.insert("TaxRate".to_string(), 1.2);
        let issues = validate_report(&report);
        assert!(issues.iter().any(|i| i.field == "kpis.TaxRate"));
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, "\"ERROR\"");
        let issue = ValidationIssue::warning("balance_sheet", "off");
        assert_eq!(issue.to_string(), "[WARNING] balance_sheet: off");
    }
}
