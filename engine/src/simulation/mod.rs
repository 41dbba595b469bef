//! Monte Carlo DCF Simulation
//!
//! Stochastic one-period projection of a report under a counterfactual
//! scenario, valued with a Gordon growth terminal value and aggregated into
//! a distribution summary.
//!
//! # Pipeline
//!
//! ```text
//! report + scenario
//!   │
//!   ├─ pre-flight: revenue > 0 (fatal), sanity checks (warnings)
//!   │
//!   ├─ sample N perturbations (one ChaCha8 stream, sequential)
//!   │
//!   ├─ project each draw (rayon, order preserved)
//!   │     revenue → COGS → EBITDA → EBIT → taxes → FCF → NPV
//!   │
//!   └─ aggregate: p10 / median / p90 NPV, medians, assumption log
//! ```

pub mod aggregate;
pub mod config;
pub mod monte_carlo;

pub use aggregate::{
    percentile, AggregatedSimulation, DistributionSummary, KeyDriver, SimulationResult,
};
pub use config::{SimulationConfig, DEFAULT_NUM_DRAWS, DEFAULT_RETAINED_SAMPLE};
pub use monte_carlo::{run_simulation, MonteCarloEngine, Perturbation, ProjectionBase};
