mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::industry::IndustryArgs;
use commands::market_data::RiskFreeRateArgs;
use commands::monte_carlo::MonteCarloArgs;
use commands::scenarios::SensitivityArgs;
use commands::valuation::{DcfArgs, ProjectArgs, WaccArgs};

/// Discounted cash flow valuation with Monte Carlo uncertainty bands
#[derive(Parser)]
#[command(
    name = "dcfv",
    version,
    about = "Discounted cash flow valuation with Monte Carlo uncertainty bands",
    long_about = "A CLI for valuing a company by discounting projected free cash flows \
                  with decimal precision. Supports WACC via CAPM, growth-driven and manual \
                  projections, Gordon growth terminal values, Monte Carlo simulation and \
                  WACC x terminal growth sensitivity grids."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log computation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate Weighted Average Cost of Capital (CAPM)
    Wacc(WaccArgs),
    /// Project free cash flows year by year
    Project(ProjectArgs),
    /// Run a deterministic DCF valuation
    Dcf(DcfArgs),
    /// Run a Monte Carlo DCF valuation
    MonteCarlo(MonteCarloArgs),
    /// Value per share across WACC and terminal growth ranges
    Sensitivity(SensitivityArgs),
    /// Look up the risk-free rate for a country
    RiskFreeRate(RiskFreeRateArgs),
    /// Show sector benchmark ratios
    IndustryBenchmarks(IndustryArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Project(args) => commands::valuation::run_project(args),
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::RiskFreeRate(args) => commands::market_data::run_risk_free_rate(args),
        Commands::IndustryBenchmarks(args) => commands::industry::run_industry_benchmarks(args),
        Commands::Version => {
            println!("dcfv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
