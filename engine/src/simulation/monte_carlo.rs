//! Monte Carlo DCF engine.
//!
//! Each draw perturbs revenue growth and OpEx, projects the income and
//! cash-flow statement one period ahead, and values the projected free cash
//! flow with a single explicit period plus a Gordon growth terminal value.
//!
//! Perturbations are sampled sequentially from one generator, so a fixed
//! seed pins down the whole run even though projection is spread across
//! rayon workers.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::aggregate::{AggregatedSimulation, DistributionSummary, KeyDriver, SimulationResult};
use super::config::SimulationConfig;
use crate::error::{OracleError, OracleResult};
use crate::financials::{bps_to_decimal, format_usd, FinancialReport, ScenarioParams};
use crate::validator::{validate_balance_sheet, validate_income_statement, validate_scenario_at};
use crate::valuation::{free_cash_flow, guarded_discount_rate, single_period_npv};

/// One sampled pair of perturbations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perturbation {
    pub revenue_growth: f64,
    pub opex_change: f64,
}

impl Perturbation {
    pub fn key_driver(&self) -> KeyDriver {
        if self.revenue_growth.abs() > self.opex_change.abs() {
            KeyDriver::Revenue
        } else {
            KeyDriver::Opex
        }
    }
}

/// Report baseline plus scenario-level constants shared by every draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionBase {
    pub revenue: f64,
    pub opex: f64,
    pub gross_margin: f64,
    pub depreciation_amortization: f64,
    pub interest_expense: f64,
    pub capex: f64,
    pub change_in_working_capital: f64,
    pub tax_rate: f64,
    /// Discount rate after the r > g guard.
    pub discount_rate: f64,
    /// Discount rate before the guard.
    pub requested_discount_rate: f64,
    pub terminal_growth: f64,
}

impl ProjectionBase {
    /// Derive the baseline from a report and scenario. Fails on non-positive or NaN revenue.
    pub fn new(
        report: &FinancialReport,
        scenario: &ScenarioParams,
        config: &SimulationConfig,
    ) -> OracleResult<Self> {
        let stmt = &report.income_statement;
        if stmt.revenue.is_nan() || stmt.revenue <= 0.0 {
            return Err(OracleError::InvalidInput(format!(
                "Base revenue must be positive, got {}",
                stmt.revenue
            )));
        }

        let requested = config.baseline_discount_rate + bps_to_decimal(scenario.discount_rate_bps);
        Ok(Self {
            revenue: stmt.revenue,
            opex: stmt.opex,
            gross_margin: stmt.gross_profit / stmt.revenue,
            depreciation_amortization: stmt.depreciation_and_amortization,
            interest_expense: stmt.interest_expense,
            capex: report.cash_flow.capex,
            change_in_working_capital: report.cash_flow.change_in_working_capital,
            tax_rate: report.tax_rate() + bps_to_decimal(scenario.tax_rate_delta_bps),
            discount_rate: guarded_discount_rate(requested, config.terminal_growth),
            requested_discount_rate: requested,
            terminal_growth: config.terminal_growth,
        })
    }

    pub fn discount_rate_clamped(&self) -> bool {
        self.discount_rate != self.requested_discount_rate
    }

    /// Project one draw down the P&L and value it.
    pub fn project(&self, scenario_id: usize, p: Perturbation) -> SimulationResult {
        let revenue = self.revenue * (1.0 + p.revenue_growth);
        let opex = self.opex * (1.0 + p.opex_change);

        let cogs = revenue * (1.0 - self.gross_margin);
        let gross_profit = revenue - cogs;
        let ebitda = gross_profit - opex;
        let ebit = ebitda - self.depreciation_amortization;

        // No tax benefit on losses.
        let taxes = if ebit > 0.0 { ebit * self.tax_rate } else { 0.0 };
        let net_income = ebit - self.interest_expense - taxes;

        let scale = revenue / self.revenue;
        let capex = self.capex * scale;
        let change_wc = self.change_in_working_capital * scale;

        let fcf = free_cash_flow(
            ebit,
            self.tax_rate,
            self.depreciation_amortization,
            change_wc,
            capex,
        );
        let npv = single_period_npv(fcf, self.discount_rate, self.terminal_growth);

        SimulationResult {
            scenario_id,
            revenue,
            ebitda,
            net_income,
            fcf,
            npv,
            key_driver: p.key_driver(),
        }
    }
}

/// Runs Monte Carlo DCF simulations for one configuration.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloEngine {
    config: SimulationConfig,
}

impl MonteCarloEngine {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate `report` under `scenario` and aggregate the draws.
    pub fn run(
        &self,
        report: &FinancialReport,
        scenario: &ScenarioParams,
    ) -> OracleResult<AggregatedSimulation> {
        self.config.validate()?;
        let base = ProjectionBase::new(report, scenario, &self.config)?;

        info!(
            report = %report.label(),
            draws = self.config.num_draws,
            scenario = %scenario,
            seed = ?self.config.seed,
            "Running Monte Carlo simulation"
        );

        let mut sanity_warnings = validate_income_statement(&report.income_statement);
        sanity_warnings.extend(validate_balance_sheet(&report.balance_sheet));
        sanity_warnings.extend(validate_scenario_at(
            scenario,
            self.config.baseline_discount_rate,
        ));
        if base.opex > base.revenue {
            warn!(
                opex = %format_usd(base.opex),
                revenue = %format_usd(base.revenue),
                "OpEx exceeds revenue"
            );
        }
        for issue in &sanity_warnings {
            debug!(field = %issue.field, severity = %issue.severity, "{}", issue.message);
        }
        if base.discount_rate_clamped() {
            debug!(
                requested = base.requested_discount_rate,
                used = base.discount_rate,
                "Discount rate clamped above terminal growth"
            );
        }

        let perturbations = self.sample(scenario)?;
        let draws: Vec<SimulationResult> = if self.config.force_sequential {
            perturbations
                .iter()
                .enumerate()
                .map(|(i, p)| base.project(i, *p))
                .collect()
        } else {
            perturbations
                .par_iter()
                .enumerate()
                .map(|(i, p)| base.project(i, *p))
                .collect()
        };

        let summary = DistributionSummary::from_draws(&draws);
        info!(
            median_npv = summary.median_npv,
            p10_npv = summary.p10_npv,
            p90_npv = summary.p90_npv,
            "Simulation complete"
        );

        let mut simulation_runs = draws;
        simulation_runs.truncate(self.config.retained_sample);

        Ok(AggregatedSimulation {
            median_npv: summary.median_npv,
            p10_npv: summary.p10_npv,
            p90_npv: summary.p90_npv,
            median_revenue: summary.median_revenue,
            median_ebitda: summary.median_ebitda,
            median_fcf: summary.median_fcf,
            assumption_log: self.assumption_log(report, scenario, &base),
            traceability: traceability(report),
            simulation_runs,
            num_draws: self.config.num_draws,
            discount_rate: base.discount_rate,
            sanity_warnings,
        })
    }

    /// Draw all perturbations up front from a single generator.
    pub fn sample(&self, scenario: &ScenarioParams) -> OracleResult<Vec<Perturbation>> {
        let growth = Normal::new(
            bps_to_decimal(scenario.revenue_growth_bps),
            self.config.revenue_sigma,
        )
        .map_err(|e| OracleError::InvalidInput(format!("revenue growth distribution: {}", e)))?;
        let opex = Normal::new(bps_to_decimal(scenario.opex_delta_bps), self.config.opex_sigma)
            .map_err(|e| OracleError::InvalidInput(format!("opex distribution: {}", e)))?;

        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok((0..self.config.num_draws)
            .map(|_| Perturbation {
                revenue_growth: growth.sample(&mut rng),
                opex_change: opex.sample(&mut rng),
            })
            .collect())
    }

    fn assumption_log(
        &self,
        report: &FinancialReport,
        scenario: &ScenarioParams,
        base: &ProjectionBase,
    ) -> Vec<String> {
        let mut log = vec![
            format!(
                "DCF model: one explicit period plus Gordon growth terminal value (g={:.2}%)",
                base.terminal_growth * 100.0
            ),
            format!(
                "Applied mean revenue growth delta of {} bps (std dev {:.2}%).",
                scenario.revenue_growth_bps,
                self.config.revenue_sigma * 100.0
            ),
            format!(
                "Applied mean OpEx delta of {} bps (std dev {:.2}%).",
                scenario.opex_delta_bps,
                self.config.opex_sigma * 100.0
            ),
            format!(
                "Tax rate set to {:.2}% ({} bps delta on {} base of {:.2}%).",
                base.tax_rate * 100.0,
                scenario.tax_rate_delta_bps,
                if report.tax_rate_is_default() {
                    "defaulted"
                } else {
                    "reported"
                },
                report.tax_rate() * 100.0
            ),
        ];

        if base.discount_rate_clamped() {
            log.push(format!(
                "Discount rate (WACC) set to {:.2}% (requested {:.2}% was at or below terminal growth).",
                base.discount_rate * 100.0,
                base.requested_discount_rate * 100.0
            ));
        } else {
            log.push(format!(
                "Discount rate (WACC) set to {:.2}%.",
                base.discount_rate * 100.0
            ));
        }

        log.push(format!(
            "Gross margin held at {:.1}%, D&A held at {}, CapEx and working capital scaled with revenue.",
            base.gross_margin * 100.0,
            format_usd(base.depreciation_amortization)
        ));
        log.push(match self.config.seed {
            Some(seed) => format!(
                "Monte Carlo simulation ran {} iterations with normal distributions (seed {}).",
                self.config.num_draws, seed
            ),
            None => format!(
                "Monte Carlo simulation ran {} iterations with normal distributions.",
                self.config.num_draws
            ),
        });
        log
    }
}

fn traceability(report: &FinancialReport) -> BTreeMap<String, String> {
    let tax_source = if report.tax_rate_is_default() {
        "Default tax rate (TaxRate KPI missing)"
    } else {
        "TaxRate KPI"
    };
    let entries = [
        ("Revenue", "Base Revenue from Income Statement"),
        ("OpEx", "Base OpEx from Income Statement"),
        ("GrossMargin", "GrossProfit / Revenue from Income Statement"),
        (
            "DepreciationAndAmortization",
            "Base D&A from Income Statement, held fixed",
        ),
        ("InterestExpense", "Base InterestExpense from Income Statement"),
        ("CapEx", "Base CapEx from Cash Flow Statement, scaled with revenue"),
        (
            "ChangeInWorkingCapital",
            "Base ChangeInWorkingCapital from Cash Flow Statement, scaled with revenue",
        ),
        ("TaxRate", tax_source),
        ("DiscountRate", "Baseline WACC plus scenario delta"),
    ];

    entries
        .into_iter()
        .map(|(field, description)| {
            let description = match report.index.get(field) {
                Some(location) => format!("{} (source: {})", description, location),
                None => description.to_string(),
            };
            (field.to_string(), description)
        })
        .collect()
}

/// Run a simulation with default settings and `num_draws` draws.
pub fn run_simulation(
    report: &FinancialReport,
    scenario: &ScenarioParams,
    num_draws: usize,
) -> OracleResult<AggregatedSimulation> {
    MonteCarloEngine::new(SimulationConfig::default().with_num_draws(num_draws))
        .run(report, scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financials::fixtures::stable_tech;

    fn seeded(draws: usize) -> MonteCarloEngine {
        MonteCarloEngine::new(
            SimulationConfig::default()
                .with_num_draws(draws)
                .with_seed(42),
        )
    }

    #[test]
    fn test_zero_perturbation_reproduces_baseline() {
        let report = stable_tech();
        let base =
            ProjectionBase::new(&report, &ScenarioParams::baseline(), &SimulationConfig::default())
                .unwrap();
        let draw = base.project(
            0,
            Perturbation {
                revenue_growth: 0.0,
                opex_change: 0.0,
            },
        );
        assert!((draw.revenue - 100_000.0).abs() < 1e-6);
        assert!((draw.ebitda - 30_000.0).abs() < 1e-6);
        // EBIT 25k, taxes 6.25k, interest 2k
        assert!((draw.net_income - 16_750.0).abs() < 1e-6);
        // 18.75k NOPAT + 5k D&A − 2k ΔWC − 8k CapEx
        assert!((draw.fcf - 13_750.0).abs() < 1e-6);
        let expected_npv = (13_750.0 + 13_750.0 * 1.02 / 0.06) / 1.08;
        assert!((draw.npv - expected_npv).abs() < 1e-6);
    }

    #[test]
    fn test_losses_pay_no_tax() {
        let mut report = stable_tech();
        report.income_statement.opex = 70_000.0;
        let base =
            ProjectionBase::new(&report, &ScenarioParams::baseline(), &SimulationConfig::default())
                .unwrap();
        let draw = base.project(
            0,
            Perturbation {
                revenue_growth: 0.0,
                opex_change: 0.0,
            },
        );
        // EBITDA −10k, EBIT −15k, no taxes, interest 2k
        assert!((draw.net_income + 17_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_discount_rate_clamped_when_below_growth() {
        let scenario = ScenarioParams::baseline().with_discount_rate_bps(-700);
        let base =
            ProjectionBase::new(&stable_tech(), &scenario, &SimulationConfig::default()).unwrap();
        assert!(base.discount_rate_clamped());
        assert!((base.discount_rate - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_key_driver_by_magnitude() {
        let p = Perturbation {
            revenue_growth: -0.05,
            opex_change: 0.01,
        };
        assert_eq!(p.key_driver(), KeyDriver::Revenue);
        let q = Perturbation {
            revenue_growth: 0.01,
            opex_change: 0.01,
        };
        assert_eq!(q.key_driver(), KeyDriver::Opex);
    }

    #[test]
    fn test_non_positive_revenue_is_invalid_input() {
        let mut report = stable_tech();
        report.income_statement.revenue = 0.0;
        let err = run_simulation(&report, &ScenarioParams::baseline(), 10).unwrap_err();
        assert!(matches!(err, OracleError::InvalidInput(ref m) if m.contains("Base revenue must be positive")));
    }

    #[test]
    fn test_nan_revenue_is_invalid_input() {
        let mut report = stable_tech();
        report.income_statement.revenue = f64::NAN;
        let err = seeded(10).run(&report, &ScenarioParams::baseline()).unwrap_err();
        assert!(matches!(err, OracleError::InvalidInput(_)));
    }

    #[test]
    fn test_unbalanced_sheet_travels_with_result() {
        let mut report = stable_tech();
        report
            .balance_sheet
            .assets
            .insert("TotalAssets".to_string(), 160_000.0);
        let sim = seeded(20).run(&report, &ScenarioParams::baseline()).unwrap();
        assert!(sim
            .sanity_warnings
            .iter()
            .any(|i| i.field == "balance_sheet" && i.message.contains("doesn't balance")));
    }

    #[test]
    fn test_negative_rate_warning_uses_configured_baseline() {
        let scenario = ScenarioParams::baseline().with_discount_rate_bps(-900);
        let is_negative_rate = |i: &crate::validator::ValidationIssue| {
            i.is_error() && i.field == "scenario.discount_rate_bps"
        };

        let sim = seeded(20).run(&stable_tech(), &scenario).unwrap();
        assert!(sim.sanity_warnings.iter().any(is_negative_rate));

        let engine = MonteCarloEngine::new(SimulationConfig {
            num_draws: 20,
            seed: Some(42),
            baseline_discount_rate: 0.12,
            ..Default::default()
        });
        let sim = engine.run(&stable_tech(), &scenario).unwrap();
        assert!((sim.discount_rate - 0.03).abs() < 1e-12);
        assert!(!sim.sanity_warnings.iter().any(is_negative_rate));
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let engine = seeded(500);
        let a = engine.run(&stable_tech(), &ScenarioParams::baseline()).unwrap();
        let b = engine.run(&stable_tech(), &ScenarioParams::baseline()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let parallel = seeded(300)
            .run(&stable_tech(), &ScenarioParams::baseline())
            .unwrap();
        let sequential = MonteCarloEngine::new(
            SimulationConfig::default()
                .with_num_draws(300)
                .with_seed(42)
                .sequential(),
        )
        .run(&stable_tech(), &ScenarioParams::baseline())
        .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_retained_sample_is_bounded_and_ordered() {
        let sim = seeded(250)
            .run(&stable_tech(), &ScenarioParams::baseline())
            .unwrap();
        assert_eq!(sim.num_draws, 250);
        assert_eq!(sim.simulation_runs.len(), 100);
        assert!(sim
            .simulation_runs
            .iter()
            .enumerate()
            .all(|(i, r)| r.scenario_id == i));
    }

    #[test]
    fn test_assumption_log_and_traceability() {
        let mut report = stable_tech();
        report.index.insert("Revenue".to_string(), "page 4".to_string());
        let scenario = ScenarioParams::baseline()
            .with_revenue_growth_bps(500)
            .with_opex_delta_bps(-200);
        let sim = seeded(50).run(&report, &scenario).unwrap();

        assert!(sim.assumption_log[1].contains("500 bps"));
        assert!(sim.assumption_log[2].contains("-200 bps"));
        assert!(sim
            .assumption_log
            .iter()
            .any(|l| l.contains("Discount rate (WACC) set to 8.00%")));
        assert_eq!(
            sim.traceability["Revenue"],
            "Base Revenue from Income Statement (source: page 4)"
        );
        assert_eq!(sim.traceability["OpEx"], "Base OpEx from Income Statement");
    }

    #[test]
    fn test_opex_above_revenue_is_warning_not_error() {
        let mut report = stable_tech();
        report.income_statement.opex = 150_000.0;
        let sim = seeded(20).run(&report, &ScenarioParams::baseline()).unwrap();
        assert!(sim
            .sanity_warnings
            .iter()
            .any(|i| i.message.contains("exceed revenue")));
    }

    #[test]
    fn test_zero_sigma_collapses_distribution() {
        let engine = MonteCarloEngine::new(SimulationConfig {
            num_draws: 20,
            seed: Some(1),
            revenue_sigma: 0.0,
            opex_sigma: 0.0,
            ..Default::default()
        });
        let sim = engine
            .run(&stable_tech(), &ScenarioParams::baseline())
            .unwrap();
        assert!((sim.p10_npv - sim.p90_npv).abs() < 1e-6);
        assert!((sim.median_fcf - 13_750.0).abs() < 1e-6);
    }
}
