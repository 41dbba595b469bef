//! Financial statement data model: the parsed report handed over by ingestion.
//!
//! Field names on the wire follow the ingestion schema (`Revenue`, `OpEx`,
//! `TaxRate`, …) so reports produced upstream deserialize unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tax rate applied when the report's KPIs do not carry one.
pub const DEFAULT_TAX_RATE: f64 = 0.25;

/// KPI key holding the effective tax rate.
pub const TAX_RATE_KPI: &str = "TaxRate";

/// Basis points per unit (1.0 = 10_000 bps).
pub const BPS_PER_UNIT: f64 = 10_000.0;

/// Convert integer basis points into a decimal fraction.
pub fn bps_to_decimal(bps: i64) -> f64 {
    bps as f64 / BPS_PER_UNIT
}

/// Income statement for a single fiscal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncomeStatement {
    pub revenue: f64,
    pub cost_of_goods_sold: f64,
    pub gross_profit: f64,
    #[serde(rename = "OpEx")]
    pub opex: f64,
    #[serde(rename = "EBITDA")]
    pub ebitda: f64,
    pub depreciation_and_amortization: f64,
    #[serde(rename = "EBIT")]
    pub ebit: f64,
    pub interest_expense: f64,
    pub taxes: f64,
    pub net_income: f64,
}

impl IncomeStatement {
    /// Gross margin as a fraction of revenue, or `None` when revenue is not positive.
    pub fn gross_margin(&self) -> Option<f64> {
        (self.revenue > 0.0).then(|| self.gross_profit / self.revenue)
    }

    /// EBITDA margin as a fraction of revenue.
    pub fn ebitda_margin(&self) -> Option<f64> {
        (self.revenue > 0.0).then(|| self.ebitda / self.revenue)
    }

    /// Net margin as a fraction of revenue.
    pub fn net_margin(&self) -> Option<f64> {
        (self.revenue > 0.0).then(|| self.net_income / self.revenue)
    }

    /// OpEx as a fraction of revenue.
    pub fn opex_ratio(&self) -> Option<f64> {
        (self.revenue > 0.0).then(|| self.opex / self.revenue)
    }
}

/// Balance sheet as category → amount mappings.
///
/// Each mapping may carry an explicit total under `Total` or
/// `Total<Category>` (e.g. `TotalAssets`); otherwise the total is the sum
/// of the remaining entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BalanceSheet {
    #[serde(default)]
    pub assets: BTreeMap<String, f64>,
    #[serde(default)]
    pub liabilities: BTreeMap<String, f64>,
    #[serde(default)]
    pub equity: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_term_debt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_term_debt: Option<f64>,
}

impl BalanceSheet {
    pub fn total_assets(&self) -> f64 {
        category_total(&self.assets, "TotalAssets")
    }

    pub fn total_liabilities(&self) -> f64 {
        category_total(&self.liabilities, "TotalLiabilities")
    }

    pub fn total_equity(&self) -> f64 {
        category_total(&self.equity, "TotalEquity")
    }
}

fn is_total_key(key: &str, named_total: &str) -> bool {
    key == "Total" || key == named_total
}

fn category_total(entries: &BTreeMap<String, f64>, named_total: &str) -> f64 {
    entries
        .get(named_total)
        .or_else(|| entries.get("Total"))
        .copied()
        .unwrap_or_else(|| {
            entries
                .iter()
                .filter(|(k, _)| !is_total_key(k, named_total))
                .map(|(_, v)| v)
                .sum()
        })
}

/// Cash flow statement. Outflows are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CashFlow {
    pub net_income: f64,
    pub depreciation: f64,
    pub change_in_working_capital: f64,
    pub cash_from_operations: f64,
    #[serde(rename = "CapEx")]
    pub capex: f64,
    pub cash_from_investing: f64,
    #[serde(default)]
    pub debt_repayment: f64,
    #[serde(default)]
    pub dividends: f64,
    #[serde(default)]
    pub cash_from_financing: f64,
    pub net_change_in_cash: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<f64>,
}

/// A complete parsed report: three statements, KPIs, and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub income_statement: IncomeStatement,
    pub balance_sheet: BalanceSheet,
    pub cash_flow: CashFlow,
    #[serde(default)]
    pub kpis: BTreeMap<String, f64>,
    /// Free-form provenance notes (e.g. source document).
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    /// Field → location in the source document.
    #[serde(default)]
    pub index: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<i32>,
}

impl FinancialReport {
    /// Effective tax rate from KPIs, falling back to [`DEFAULT_TAX_RATE`].
    pub fn tax_rate(&self) -> f64 {
        self.kpis
            .get(TAX_RATE_KPI)
            .copied()
            .unwrap_or(DEFAULT_TAX_RATE)
    }

    /// Whether the tax rate was defaulted rather than reported.
    pub fn tax_rate_is_default(&self) -> bool {
        !self.kpis.contains_key(TAX_RATE_KPI)
    }

    /// Display label for logs and prompts.
    pub fn label(&self) -> String {
        match (&self.company_name, self.fiscal_year) {
            (Some(name), Some(year)) => format!("{} FY{}", name, year),
            (Some(name), None) => name.clone(),
            (None, Some(year)) => format!("FY{}", year),
            (None, None) => "unnamed report".to_string(),
        }
    }
}

/// Counterfactual scenario expressed as basis-point deltas on the report baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioParams {
    #[serde(default)]
    pub revenue_growth_bps: i64,
    #[serde(default)]
    pub opex_delta_bps: i64,
    #[serde(default)]
    pub tax_rate_delta_bps: i64,
    #[serde(default)]
    pub discount_rate_bps: i64,
}

impl ScenarioParams {
    /// The baseline scenario (all deltas zero).
    pub fn baseline() -> Self {
        Self::default()
    }

    pub fn with_revenue_growth_bps(mut self, bps: i64) -> Self {
        self.revenue_growth_bps = bps;
        self
    }

    pub fn with_opex_delta_bps(mut self, bps: i64) -> Self {
        self.opex_delta_bps = bps;
        self
    }

    pub fn with_tax_rate_delta_bps(mut self, bps: i64) -> Self {
        self.tax_rate_delta_bps = bps;
        self
    }

    pub fn with_discount_rate_bps(mut self, bps: i64) -> Self {
        self.discount_rate_bps = bps;
        self
    }

    pub fn is_baseline(&self) -> bool {
        *self == Self::default()
    }
}

impl std::fmt::Display for ScenarioParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "revenue {:+} bps, opex {:+} bps, tax {:+} bps, discount {:+} bps",
            self.revenue_growth_bps,
            self.opex_delta_bps,
            self.tax_rate_delta_bps,
            self.discount_rate_bps
        )
    }
}

/// Format a dollar amount with thousands separators and no decimals.
pub fn format_usd(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_uses_ingestion_field_names() {
        let json = serde_json::to_value(fixtures::stable_tech()).unwrap();
        assert_eq!(json["income_statement"]["Revenue"], 100_000.0);
        assert_eq!(json["income_statement"]["OpEx"], 30_000.0);
        assert_eq!(json["income_statement"]["EBITDA"], 30_000.0);
        assert_eq!(json["cash_flow"]["CapEx"], -8_000.0);
        assert_eq!(json["kpis"]["TaxRate"], 0.25);
    }

    #[test]
    fn test_report_parses_minimal_ingestion_payload() {
        let raw = r#"{
            "income_statement": {
                "Revenue": 50000, "CostOfGoodsSold": 15000, "GrossProfit": 35000,
                "OpEx": 25000, "EBITDA": 10000, "DepreciationAndAmortization": 2000,
                "EBIT": 8000, "InterestExpense": 1000, "Taxes": 1750, "NetIncome": 5250
            },
            "balance_sheet": {
                "Assets": {"TotalAssets": 80000},
                "Liabilities": {"TotalLiabilities": 30000},
                "Equity": {"TotalEquity": 50000}
            },
            "cash_flow": {
                "NetIncome": 5250, "Depreciation": 2000, "ChangeInWorkingCapital": -3000,
                "CashFromOperations": 4250, "CapEx": -10000, "CashFromInvesting": -10000,
                "NetChangeInCash": -5750
            }
        }"#;
        let report: FinancialReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.income_statement.opex, 25_000.0);
        assert_eq!(report.cash_flow.dividends, 0.0);
        assert!(report.tax_rate_is_default());
        assert!((report.tax_rate() - DEFAULT_TAX_RATE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_category_total_prefers_explicit_total() {
        let bs = BalanceSheet {
            assets: BTreeMap::from([
                ("Cash".to_string(), 10.0),
                ("TotalAssets".to_string(), 100.0),
            ]),
            liabilities: BTreeMap::from([("Debt".to_string(), 30.0), ("Payables".to_string(), 10.0)]),
            equity: BTreeMap::from([("Total".to_string(), 60.0)]),
            ..Default::default()
        };
        assert_eq!(bs.total_assets(), 100.0);
        assert_eq!(bs.total_liabilities(), 40.0);
        assert_eq!(bs.total_equity(), 60.0);
    }

    #[test]
    fn test_margins_none_without_revenue() {
        let mut stmt = fixtures::stable_tech().income_statement;
        assert!((stmt.gross_margin().unwrap() - 0.6).abs() < 1e-12);
        stmt.revenue = 0.0;
        assert!(stmt.gross_margin().is_none());
        assert!(stmt.opex_ratio().is_none());
    }

    #[test]
    fn test_scenario_builders_and_display() {
        let s = ScenarioParams::baseline()
            .with_revenue_growth_bps(500)
            .with_discount_rate_bps(-100);
        assert!(!s.is_baseline());
        assert_eq!(
            s.to_string(),
            "revenue +500 bps, opex +0 bps, tax +0 bps, discount -100 bps"
        );
        assert!((bps_to_decimal(250) - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(150_000.0), "$150,000");
        assert_eq!(format_usd(-20_000.0), "-$20,000");
        assert_eq!(format_usd(1_234_567.8), "$1,234,568");
    }

    #[test]
    fn test_report_label() {
        let mut report = fixtures::stable_tech();
        assert_eq!(report.label(), "Stable Tech FY2024");
        report.company_name = None;
        report.fiscal_year = None;
        assert_eq!(report.label(), "unnamed report");
    }
}
