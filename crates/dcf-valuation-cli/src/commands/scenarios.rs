use clap::Args;
use serde_json::Value;

use dcf_valuation_core::scenarios::sensitivity::{self, SensitivityInput};

use crate::input;

/// Arguments for the WACC x terminal growth sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Points per axis for the default ranges
    #[arg(long)]
    pub steps: Option<usize>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sens_input: SensitivityInput = input::load(args.input.as_deref(), "sensitivity")?;
    if let Some(steps) = args.steps {
        sens_input.config.steps = steps;
    }
    let result = sensitivity::run_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}
