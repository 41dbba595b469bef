//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};
use crate::valuation::{BASELINE_DISCOUNT_RATE, TERMINAL_GROWTH_RATE};

/// Default number of Monte Carlo draws.
pub const DEFAULT_NUM_DRAWS: usize = 10_000;

/// Default number of raw draws kept in the aggregate.
pub const DEFAULT_RETAINED_SAMPLE: usize = 100;

/// Tunables for a Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of independent draws.
    pub num_draws: usize,
    /// Fixed seed for bit-reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Standard deviation of the revenue growth perturbation.
    pub revenue_sigma: f64,
    /// Standard deviation of the OpEx change perturbation.
    pub opex_sigma: f64,
    /// Discount rate before the scenario delta.
    pub baseline_discount_rate: f64,
    /// Perpetual growth for the terminal value.
    pub terminal_growth: f64,
    /// Raw draws kept for inspection.
    pub retained_sample: usize,
    /// Project draws on the calling thread only.
    pub force_sequential: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_draws: DEFAULT_NUM_DRAWS,
            seed: None,
            revenue_sigma: 0.02,
            opex_sigma: 0.01,
            baseline_discount_rate: BASELINE_DISCOUNT_RATE,
            terminal_growth: TERMINAL_GROWTH_RATE,
            retained_sample: DEFAULT_RETAINED_SAMPLE,
            force_sequential: false,
        }
    }
}

impl SimulationConfig {
    pub fn with_num_draws(mut self, num_draws: usize) -> Self {
        self.num_draws = num_draws;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sequential(mut self) -> Self {
        self.force_sequential = true;
        self
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> OracleResult<()> {
        if self.num_draws == 0 {
            return Err(OracleError::InvalidInput(
                "num_draws must be at least 1".to_string(),
            ));
        }
        for (name, sigma) in [
            ("revenue_sigma", self.revenue_sigma),
            ("opex_sigma", self.opex_sigma),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(OracleError::InvalidInput(format!(
                    "{} must be a non-negative finite number, got {}",
                    name, sigma
                )));
            }
        }
        if !self.baseline_discount_rate.is_finite() || !self.terminal_growth.is_finite() {
            return Err(OracleError::InvalidInput(
                "discount rate and terminal growth must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
