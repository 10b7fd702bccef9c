use clap::Args;
use serde_json::{json, Value};

use dcf_valuation_core::valuation::industry::Industry;

/// Arguments for the sector benchmark lookup
#[derive(Args)]
pub struct IndustryArgs {
    /// Sector name (technology, healthcare, real-estate, ...); all sectors when omitted
    #[arg(long)]
    pub industry: Option<String>,
}

pub fn run_industry_benchmarks(args: IndustryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let industries = match args.industry {
        Some(name) => vec![name.parse::<Industry>()?],
        None => Industry::ALL.to_vec(),
    };

    let rows: Vec<Value> = industries
        .into_iter()
        .map(|industry| {
            let b = industry.benchmarks();
            json!({
                "industry": industry.to_string(),
                "high_risk": industry.is_high_risk(),
                "ebitda_margin": b.ebitda_margin,
                "capex_pct_of_revenue": b.capex_pct_of_revenue,
                "depreciation_pct_of_revenue": b.depreciation_pct_of_revenue,
                "wc_change_pct_of_revenue_growth": b.wc_change_pct_of_revenue_growth,
                "beta": b.beta,
                "debt_to_equity": b.debt_to_equity,
                "return_on_equity": b.return_on_equity,
                "return_on_invested_capital": b.return_on_invested_capital,
                "revenue_multiple": b.revenue_multiple,
                "typical_growth_high": b.typical_growth_high,
                "typical_growth_mature": b.typical_growth_mature,
            })
        })
        .collect();

    Ok(json!({ "result": rows }))
}
