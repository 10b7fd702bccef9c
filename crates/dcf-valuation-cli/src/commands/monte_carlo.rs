use clap::Args;
use serde_json::Value;

use dcf_valuation_core::monte_carlo::simulation::{self, StochasticInput};

use crate::input;

/// Arguments for a Monte Carlo DCF valuation
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of trials (1..=100000)
    #[arg(long)]
    pub trials: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut mc_input: StochasticInput = input::load(args.input.as_deref(), "monte-carlo")?;
    if let Some(trials) = args.trials {
        mc_input.simulation.trial_count = trials;
    }
    if let Some(seed) = args.seed {
        mc_input.simulation.seed = seed;
    }
    let result = simulation::valuate_stochastic(&mc_input)?;
    Ok(serde_json::to_value(result)?)
}
