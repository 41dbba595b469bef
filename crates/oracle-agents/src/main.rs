//! Counterfactual Oracle CLI
//!
//! ```bash
//! # Sanity-check a parsed report against a scenario
//! counterfactual-oracle validate --report acme.json --opex-delta-bps 300
//!
//! # Monte Carlo DCF distribution as JSON
//! counterfactual-oracle simulate --report acme.json --revenue-growth-bps 500 --seed 42
//!
//! # Simulation followed by the optimist/skeptic debate
//! GEMINI_API_KEY=... DEEPSEEK_API_KEY=... \
//!   counterfactual-oracle --config oracle.toml debate --report acme.json --max-rounds 6
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use oracle_agents::{load_report, AgentSet, OracleConfig};
use oracle_engine::{
    check_balance_sheet, validate_report, validate_scenario_at, DebateOrchestrator,
    MonteCarloEngine, ScenarioParams,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file (endpoints, [simulation], [debate]); env defaults otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the financial sanity validator and print its findings
    Validate(ScenarioArgs),

    /// Run the Monte Carlo simulation and print the aggregate as JSON
    Simulate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Simulate, then debate the result and print both as JSON
    Debate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        sampling: SamplingArgs,

        /// Round ceiling (overrides [debate].max_rounds)
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Consecutive converging checks to stop (overrides [debate].convergence_threshold)
        #[arg(long)]
        convergence_threshold: Option<u32>,

        /// Abort instead of accepting an ungrounded optimist turn
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Financial report JSON
    #[arg(long)]
    report: PathBuf,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    revenue_growth_bps: i64,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    opex_delta_bps: i64,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    tax_rate_delta_bps: i64,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    discount_rate_bps: i64,
}

impl ScenarioArgs {
    fn params(&self) -> ScenarioParams {
        ScenarioParams::baseline()
            .with_revenue_growth_bps(self.revenue_growth_bps)
            .with_opex_delta_bps(self.opex_delta_bps)
            .with_tax_rate_delta_bps(self.tax_rate_delta_bps)
            .with_discount_rate_bps(self.discount_rate_bps)
    }
}

#[derive(Args, Debug)]
struct SamplingArgs {
    /// Number of Monte Carlo draws (overrides [simulation].num_draws)
    #[arg(long)]
    draws: Option<usize>,

    /// Seed for a reproducible run (overrides [simulation].seed)
    #[arg(long)]
    seed: Option<u64>,
}

impl SamplingArgs {
    fn apply(&self, config: &mut OracleConfig) {
        if let Some(draws) = self.draws {
            config.simulation.num_draws = draws;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = OracleConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Validate(scenario) => {
            let report = load_report(&scenario.report)?;
            let mut issues = validate_report(&report);
            issues.extend(validate_scenario_at(
                &scenario.params(),
                config.simulation.baseline_discount_rate,
            ));
            info!(
                report = %report.label(),
                issues = issues.len(),
                "Validation complete"
            );
            print_json(&serde_json::json!({
                "report": report.label(),
                "balance": check_balance_sheet(&report.balance_sheet),
                "issues": issues,
            }))?;
        }
        Command::Simulate { scenario, sampling } => {
            sampling.apply(&mut config);
            let report = load_report(&scenario.report)?;
            let simulation = MonteCarloEngine::new(config.simulation.clone())
                .run(&report, &scenario.params())
                .context("Simulation failed")?;
            print_json(&simulation)?;
        }
        Command::Debate {
            scenario,
            sampling,
            max_rounds,
            convergence_threshold,
            strict,
        } => {
            sampling.apply(&mut config);
            if let Some(max_rounds) = max_rounds {
                config.debate.max_rounds = max_rounds;
            }
            if let Some(threshold) = convergence_threshold {
                config.debate.convergence_threshold = threshold;
            }
            if strict {
                config.debate.strict_grounding = true;
            }

            let report = load_report(&scenario.report)?;
            let simulation = MonteCarloEngine::new(config.simulation.clone())
                .run(&report, &scenario.params())
                .context("Simulation failed")?;
            for issue in &simulation.sanity_warnings {
                warn!(field = %issue.field, "{}", issue.message);
            }

            let agents = AgentSet::from_config(&config)?;
            info!(
                optimist = %config.optimist.model,
                skeptic = %config.skeptic.model,
                grounding = %config.grounding.model,
                max_rounds = config.debate.max_rounds,
                "Starting debate"
            );
            let orchestrator = DebateOrchestrator::new(agents.optimist, agents.skeptic, agents.checker)
                .with_config(config.debate.clone())
                .with_lexicon(config.lexicon.clone());
            let debate = orchestrator
                .run_debate(&report, &simulation)
                .await
                .context("Debate failed")?;
            info!("{}", debate.summary_line());

            print_json(&serde_json::json!({
                "simulation": simulation,
                "debate": debate,
            }))?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", rendered);
    Ok(())
}
