use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dcf_valuation_core::market_data::{resolve_risk_free_rate, Country, StaticRiskFreeRates};
use dcf_valuation_core::valuation::dcf::{self, DeterministicInput, DiscountRate};
use dcf_valuation_core::valuation::projection::{self, ProjectionStrategy};
use dcf_valuation_core::valuation::wacc::{self, WaccInput};

use crate::input;

/// Arguments for WACC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Risk-free rate as a fraction (e.g. 0.044); taken from --country when omitted
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Look up the risk-free rate from the fallback yield table
    #[arg(long)]
    pub country: Option<String>,

    /// Levered equity beta
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Equity risk premium (e.g. 0.06 for 6%)
    #[arg(long, alias = "erp")]
    pub equity_risk_premium: Option<Decimal>,

    /// Pre-tax cost of debt
    #[arg(long)]
    pub cost_of_debt: Option<Decimal>,

    /// Marginal corporate tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Equity weight in capital structure
    #[arg(long)]
    pub equity_weight: Option<Decimal>,

    /// Debt weight; defaults to 1 - equity weight
    #[arg(long)]
    pub debt_weight: Option<Decimal>,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a free cash flow projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON or YAML projection strategy
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a deterministic DCF valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfArgs {
    /// Path to JSON or YAML valuation input
    #[arg(long)]
    pub input: Option<String>,

    /// Override the discount rate with an explicit WACC
    #[arg(long)]
    pub wacc: Option<Decimal>,

    /// Override the terminal growth rate
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Current share price, enables the investment assessment
    #[arg(long)]
    pub market_price: Option<Decimal>,
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wacc_input: WaccInput = if args.input.is_some() {
        input::load(args.input.as_deref(), "wacc")?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let risk_free_rate = match (args.risk_free_rate, &args.country) {
            (Some(rate), _) => rate,
            (None, Some(country)) => {
                let country: Country = country.parse()?;
                resolve_risk_free_rate(&StaticRiskFreeRates::default(), &country)?
            }
            (None, None) => {
                return Err("--risk-free-rate or --country is required (or provide --input)".into())
            }
        };
        WaccInput {
            risk_free_rate,
            beta: args.beta.ok_or("--beta is required (or provide --input)")?,
            equity_risk_premium: args
                .equity_risk_premium
                .ok_or("--equity-risk-premium is required (or provide --input)")?,
            cost_of_debt: args
                .cost_of_debt
                .ok_or("--cost-of-debt is required (or provide --input)")?,
            tax_rate: args
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            equity_weight: args
                .equity_weight
                .ok_or("--equity-weight is required (or provide --input)")?,
            debt_weight: args.debt_weight,
        }
    };

    let result = wacc::calculate_wacc(&wacc_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let strategy: ProjectionStrategy = input::load(args.input.as_deref(), "project")?;
    let result = projection::calculate_projection(&strategy)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut dcf_input: DeterministicInput = input::load(args.input.as_deref(), "dcf")?;
    if let Some(w) = args.wacc {
        dcf_input.discount_rate = DiscountRate::Wacc(w);
    }
    if let Some(g) = args.terminal_growth {
        dcf_input.terminal_growth_rate = g;
    }
    if args.market_price.is_some() {
        dcf_input.current_market_price = args.market_price;
    }

    let result = dcf::valuate_deterministic(&dcf_input)?;
    Ok(serde_json::to_value(result)?)
}
