//! Per-draw results and the aggregated distribution summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::validator::ValidationIssue;

/// Which perturbation dominated a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyDriver {
    Revenue,
    #[serde(rename = "OpEx")]
    Opex,
}

impl std::fmt::Display for KeyDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Revenue => write!(f, "Revenue"),
            Self::Opex => write!(f, "OpEx"),
        }
    }
}

/// Outputs of one Monte Carlo draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario_id: usize,
    pub revenue: f64,
    pub ebitda: f64,
    pub net_income: f64,
    pub fcf: f64,
    pub npv: f64,
    pub key_driver: KeyDriver,
}

/// Order statistics over a set of draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub median_npv: f64,
    pub p10_npv: f64,
    pub p90_npv: f64,
    pub median_revenue: f64,
    pub median_ebitda: f64,
    pub median_fcf: f64,
}

impl DistributionSummary {
    /// Summarize draws. Depends only on the multiset of values, not their order.
    pub fn from_draws(draws: &[SimulationResult]) -> Self {
        let npvs = sorted(draws.iter().map(|d| d.npv));
        let revenues = sorted(draws.iter().map(|d| d.revenue));
        let ebitdas = sorted(draws.iter().map(|d| d.ebitda));
        let fcfs = sorted(draws.iter().map(|d| d.fcf));

        Self {
            median_npv: percentile(&npvs, 50.0),
            p10_npv: percentile(&npvs, 10.0),
            p90_npv: percentile(&npvs, 90.0),
            median_revenue: percentile(&revenues, 50.0),
            median_ebitda: percentile(&ebitdas, 50.0),
            median_fcf: percentile(&fcfs, 50.0),
        }
    }
}

fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Percentile `p` (0–100) of an ascending slice, interpolating linearly
/// between the closest ranks. Empty input yields 0.0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let weight = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * weight
        }
    }
}

/// Distribution summary of a full simulation run, consumed by the debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSimulation {
    pub median_npv: f64,
    pub p10_npv: f64,
    pub p90_npv: f64,
    pub median_revenue: f64,
    pub median_ebitda: f64,
    pub median_fcf: f64,
    /// Human-readable assumptions, in the order they were applied.
    pub assumption_log: Vec<String>,
    /// Field → provenance description.
    pub traceability: BTreeMap<String, String>,
    /// The first draws of the run, bounded by the retained-sample size.
    pub simulation_runs: Vec<SimulationResult>,
    /// Total draws behind the summary statistics.
    pub num_draws: usize,
    /// Discount rate actually used, after the r > g guard.
    pub discount_rate: f64,
    /// Pre-flight sanity findings; never fatal.
    #[serde(default)]
    pub sanity_warnings: Vec<ValidationIssue>,
}

impl AggregatedSimulation {
    pub fn summary(&self) -> DistributionSummary {
        DistributionSummary {
            median_npv: self.median_npv,
            p10_npv: self.p10_npv,
            p90_npv: self.p90_npv,
            median_revenue: self.median_revenue,
            median_ebitda: self.median_ebitda,
            median_fcf: self.median_fcf,
        }
    }

    /// Width of the p10–p90 NPV band.
    pub fn npv_spread(&self) -> f64 {
        self.p90_npv - self.p10_npv
    }

    pub fn has_warnings(&self) -> bool {
        !self.sanity_warnings.is_empty()
    }
}
