//! Simulation integration test: drives the public engine API from a report
//! in the ingestion JSON schema through validation, valuation, and the
//! Monte Carlo run.

use oracle_engine::simulation::{percentile, DistributionSummary, KeyDriver};
use oracle_engine::{
    check_balance_sheet, free_cash_flow, net_present_value, run_simulation, validate_report,
    validate_scenario_params, FinancialReport, MonteCarloEngine, OracleError, ScenarioParams,
    Severity, SimulationConfig, SimulationResult,
};

const REPORT_JSON: &str = r#"{
    "company_name": "Mid Cap Industrial",
    "fiscal_year": 2023,
    "income_statement": {
        "Revenue": 500000.0,
        "CostOfGoodsSold": 300000.0,
        "GrossProfit": 200000.0,
        "OpEx": 120000.0,
        "EBITDA": 80000.0,
        "DepreciationAndAmortization": 20000.0,
        "EBIT": 60000.0,
        "InterestExpense": 10000.0,
        "Taxes": 12500.0,
        "NetIncome": 37500.0
    },
    "balance_sheet": {
        "Assets": {"Cash": 50000.0, "Receivables": 150000.0, "PPE": 400000.0},
        "Liabilities": {"Payables": 100000.0, "Debt": 200000.0},
        "Equity": {"Total": 300000.0}
    },
    "cash_flow": {
        "NetIncome": 37500.0,
        "Depreciation": 20000.0,
        "ChangeInWorkingCapital": -5000.0,
        "CashFromOperations": 52500.0,
        "CapEx": -30000.0,
        "CashFromInvesting": -30000.0,
        "NetChangeInCash": 22500.0
    },
    "kpis": {"TaxRate": 0.25},
    "index": {"Revenue": "Consolidated statement of operations, p. 41"}
}"#;

fn report() -> FinancialReport {
    serde_json::from_str(REPORT_JSON).unwrap()
}

fn seeded(draws: usize, seed: u64) -> MonteCarloEngine {
    MonteCarloEngine::new(
        SimulationConfig::default()
            .with_num_draws(draws)
            .with_seed(seed),
    )
}

#[test]
fn test_report_parses_and_validates_clean() {
    let report = report();
    assert_eq!(report.label(), "Mid Cap Industrial FY2023");
    assert!(report.balance_sheet.equity.contains_key("Total"));

    let check = check_balance_sheet(&report.balance_sheet);
    assert!(check.is_balanced);
    assert!((check.total_assets - 600_000.0).abs() < 1e-9);

    let issues = validate_report(&report);
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn test_reference_valuation_math() {
    assert_eq!(free_cash_flow(100.0, 0.25, 10.0, -5.0, -20.0), 60.0);
    let npv = net_present_value(&[100.0, 100.0], 0.10);
    assert!((npv - 173.55).abs() < 0.01);
}

#[test]
fn test_percentiles_are_ordered() {
    let sim = seeded(2_000, 11)
        .run(&report(), &ScenarioParams::baseline())
        .unwrap();
    assert!(sim.p10_npv <= sim.median_npv);
    assert!(sim.median_npv <= sim.p90_npv);
    assert!(sim.npv_spread() > 0.0);
    assert_eq!(sim.num_draws, 2_000);
    assert_eq!(sim.simulation_runs.len(), 100);
}

#[test]
fn test_non_positive_revenue_rejected() {
    for revenue in [0.0, -1.0] {
        let mut report = report();
        report.income_statement.revenue = revenue;
        let err = run_simulation(&report, &ScenarioParams::baseline(), 100).unwrap_err();
        match err {
            OracleError::InvalidInput(msg) => {
                assert!(msg.contains("Base revenue must be positive"))
            }
            other => panic!("expected InvalidInput, got {other}"),
        }
    }
}

#[test]
fn test_npv_falls_as_discount_rate_rises() {
    let report = report();
    let medians: Vec<f64> = [0, 100, 200]
        .into_iter()
        .map(|bps| {
            seeded(1_000, 42)
                .run(
                    &report,
                    &ScenarioParams::baseline().with_discount_rate_bps(bps),
                )
                .unwrap()
                .median_npv
        })
        .collect();
    assert!(medians[0] > medians[1], "{:?}", medians);
    assert!(medians[1] > medians[2], "{:?}", medians);
}

#[test]
fn test_revenue_growth_shifts_distribution_up() {
    let report = report();
    let base = seeded(1_000, 3)
        .run(&report, &ScenarioParams::baseline())
        .unwrap();
    let growth = seeded(1_000, 3)
        .run(
            &report,
            &ScenarioParams::baseline().with_revenue_growth_bps(1_000),
        )
        .unwrap();
    assert!(growth.median_revenue > base.median_revenue);
    assert!(growth.median_npv > base.median_npv);
    // +10% mean growth with 2% sigma: median near 550k
    assert!((growth.median_revenue - 550_000.0).abs() < 5_000.0);
}

#[test]
fn test_aggregation_is_idempotent() {
    let sim = seeded(500, 9)
        .run(&report(), &ScenarioParams::baseline())
        .unwrap();
    let draws: Vec<SimulationResult> = sim.simulation_runs.clone();
    let first = DistributionSummary::from_draws(&draws);
    let second = DistributionSummary::from_draws(&draws);
    assert_eq!(first, second);

    let mut shuffled = draws.clone();
    shuffled.rotate_left(37);
    assert_eq!(first, DistributionSummary::from_draws(&shuffled));
}

#[test]
fn test_percentile_matches_sorted_sample() {
    let sim = seeded(100, 5)
        .run(&report(), &ScenarioParams::baseline())
        .unwrap();
    // 100 draws are all retained, so the summary is recomputable from them
    let mut npvs: Vec<f64> = sim.simulation_runs.iter().map(|r| r.npv).collect();
    npvs.sort_by(|a, b| a.total_cmp(b));
    assert!((percentile(&npvs, 50.0) - sim.median_npv).abs() < 1e-9);
    assert!((percentile(&npvs, 10.0) - sim.p10_npv).abs() < 1e-9);
}

#[test]
fn test_key_driver_reflects_dominant_perturbation() {
    let scenario = ScenarioParams::baseline().with_revenue_growth_bps(2_000);
    let sim = seeded(200, 1).run(&report(), &scenario).unwrap();
    // Mean growth of 20% dwarfs the 1% OpEx noise
    assert!(sim
        .simulation_runs
        .iter()
        .all(|r| r.key_driver == KeyDriver::Revenue));
}

#[test]
fn test_scenario_warnings_travel_with_result() {
    let scenario = ScenarioParams::baseline()
        .with_opex_delta_bps(12_000)
        .with_discount_rate_bps(-900);
    let sim = seeded(50, 2).run(&report(), &scenario).unwrap();
    assert!(sim
        .sanity_warnings
        .iter()
        .any(|i| i.message.contains("very large")));
    assert!(sim
        .sanity_warnings
        .iter()
        .any(|i| i.severity == Severity::Error && i.message.contains("negative")));
    // Guard keeps the Gordon denominator positive
    assert!((sim.discount_rate - 0.03).abs() < 1e-12);
    assert!(sim.assumption_log.iter().any(|l| l.contains("requested")));
}

#[test]
fn test_scenario_param_checks() {
    let issues = validate_scenario_params(0, 0, 0);
    assert!(issues.is_empty());

    let issues = validate_scenario_params(10_000, -10_000, 0);
    assert_eq!(
        issues
            .iter()
            .filter(|i| i.message.contains("very large"))
            .count(),
        2
    );
}

#[test]
fn test_traceability_carries_source_index() {
    let sim = seeded(10, 4)
        .run(&report(), &ScenarioParams::baseline())
        .unwrap();
    assert!(sim.traceability["Revenue"].contains("p. 41"));
    assert!(sim.traceability.contains_key("TaxRate"));
}

#[test]
fn test_result_serializes_for_callers() {
    let sim = seeded(10, 4)
        .run(&report(), &ScenarioParams::baseline())
        .unwrap();
    let json = serde_json::to_value(&sim).unwrap();
    assert!(json["median_npv"].is_number());
    assert_eq!(json["simulation_runs"].as_array().unwrap().len(), 10);
}
