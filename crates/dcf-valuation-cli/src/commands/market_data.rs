use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use dcf_valuation_core::market_data::{
    resolve_risk_free_rate, Country, RiskFreeRateSource, StaticRiskFreeRates,
};

/// Arguments for the risk-free rate lookup
#[derive(Args)]
pub struct RiskFreeRateArgs {
    /// Country name or code (india, usa, uk, germany, france, ...)
    #[arg(long, default_value = "india")]
    pub country: String,

    /// Use this yield (percent) instead of the fallback table
    #[arg(long)]
    pub rate_pct: Option<Decimal>,
}

pub fn run_risk_free_rate(args: RiskFreeRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let country: Country = args.country.parse()?;
    let mut source = StaticRiskFreeRates::default();
    if let Some(pct) = args.rate_pct {
        source = source.with_rate(country.clone(), pct);
    }

    let pct = source.risk_free_rate_pct(&country)?;
    let rate = resolve_risk_free_rate(&source, &country)?;
    Ok(json!({
        "result": {
            "country": country,
            "currency": country.currency(),
            "risk_free_rate_pct": pct,
            "risk_free_rate": rate,
        }
    }))
}
