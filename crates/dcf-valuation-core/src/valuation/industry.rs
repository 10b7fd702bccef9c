use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::{Money, Rate};

use super::analysis::FinancialRatios;
use super::projection::{DepreciationMode, GrowthAssumptions, YearAssumption};
use super::wacc::WaccInput;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Sector of the company being valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Technology,
    Healthcare,
    ConsumerGoods,
    FinancialServices,
    Manufacturing,
    Energy,
    RealEstate,
    Retail,
    Telecommunications,
    Utilities,
}

/// Sector averages. Ratios are fractions (0.25 = 25%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryBenchmarks {
    pub ebitda_margin: Rate,
    pub capex_pct_of_revenue: Rate,
    pub depreciation_pct_of_revenue: Rate,
    pub wc_change_pct_of_revenue_growth: Rate,
    pub beta: Decimal,
    pub debt_to_equity: Decimal,
    pub return_on_equity: Rate,
    pub return_on_invested_capital: Rate,
    /// Enterprise value over revenue
    pub revenue_multiple: Decimal,
    /// Revenue growth in the early, high-growth years
    pub typical_growth_high: Rate,
    /// Revenue growth once the business has matured
    pub typical_growth_mature: Rate,
}

/// Projected company metrics next to the sector averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub industry: Industry,
    pub benchmarks: IndustryBenchmarks,
    pub ebitda_margin: Rate,
    pub capex_intensity: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<Decimal>,
    /// Value per share over final-year revenue per share
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_multiple: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Industry table
// ---------------------------------------------------------------------------

impl Industry {
    pub const ALL: [Industry; 10] = [
        Industry::Technology,
        Industry::Healthcare,
        Industry::ConsumerGoods,
        Industry::FinancialServices,
        Industry::Manufacturing,
        Industry::Energy,
        Industry::RealEstate,
        Industry::Retail,
        Industry::Telecommunications,
        Industry::Utilities,
    ];

    /// Sectors that add to the risk score.
    pub fn is_high_risk(self) -> bool {
        matches!(self, Industry::Technology | Industry::Energy | Industry::RealEstate)
    }

    pub fn benchmarks(self) -> IndustryBenchmarks {
        // (margin, capex, dep, wc, beta, d/e, roe, roic, multiple, high, mature)
        #[rustfmt::skip]
        let row = match self {
            Industry::Technology => [
                dec!(0.25), dec!(0.05), dec!(0.04), dec!(0.02), dec!(1.3), dec!(0.15),
                dec!(0.18), dec!(0.15), dec!(8.5), dec!(0.25), dec!(0.05),
            ],
            Industry::Healthcare => [
                dec!(0.22), dec!(0.08), dec!(0.06), dec!(0.03), dec!(0.9), dec!(0.25),
                dec!(0.14), dec!(0.12), dec!(6.0), dec!(0.15), dec!(0.04),
            ],
            Industry::ConsumerGoods => [
                dec!(0.18), dec!(0.06), dec!(0.05), dec!(0.04), dec!(1.1), dec!(0.35),
                dec!(0.13), dec!(0.11), dec!(3.5), dec!(0.12), dec!(0.035),
            ],
            Industry::FinancialServices => [
                dec!(0.35), dec!(0.02), dec!(0.02), dec!(0.01), dec!(1.2), dec!(0.80),
                dec!(0.12), dec!(0.10), dec!(2.8), dec!(0.10), dec!(0.03),
            ],
            Industry::Manufacturing => [
                dec!(0.15), dec!(0.07), dec!(0.06), dec!(0.035), dec!(1.0), dec!(0.45),
                dec!(0.11), dec!(0.09), dec!(2.2), dec!(0.08), dec!(0.025),
            ],
            Industry::Energy => [
                dec!(0.20), dec!(0.12), dec!(0.10), dec!(0.02), dec!(1.4), dec!(0.40),
                dec!(0.10), dec!(0.08), dec!(1.8), dec!(0.06), dec!(0.02),
            ],
            Industry::RealEstate => [
                dec!(0.30), dec!(0.15), dec!(0.08), dec!(0.015), dec!(0.8), dec!(0.65),
                dec!(0.09), dec!(0.07), dec!(4.2), dec!(0.07), dec!(0.025),
            ],
            Industry::Retail => [
                dec!(0.12), dec!(0.04), dec!(0.03), dec!(0.05), dec!(1.1), dec!(0.30),
                dec!(0.14), dec!(0.12), dec!(1.5), dec!(0.09), dec!(0.025),
            ],
            Industry::Telecommunications => [
                dec!(0.28), dec!(0.18), dec!(0.15), dec!(0.02), dec!(0.9), dec!(0.55),
                dec!(0.08), dec!(0.06), dec!(2.5), dec!(0.05), dec!(0.02),
            ],
            Industry::Utilities => [
                dec!(0.25), dec!(0.10), dec!(0.08), dec!(0.01), dec!(0.7), dec!(0.70),
                dec!(0.07), dec!(0.05), dec!(3.0), dec!(0.04), dec!(0.02),
            ],
        };
        let [ebitda_margin, capex, dep, wc, beta, de, roe, roic, multiple, high, mature] = row;
        IndustryBenchmarks {
            ebitda_margin,
            capex_pct_of_revenue: capex,
            depreciation_pct_of_revenue: dep,
            wc_change_pct_of_revenue_growth: wc,
            beta,
            debt_to_equity: de,
            return_on_equity: roe,
            return_on_invested_capital: roic,
            revenue_multiple: multiple,
            typical_growth_high: high,
            typical_growth_mature: mature,
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Industry::Technology => "Technology",
            Industry::Healthcare => "Healthcare",
            Industry::ConsumerGoods => "Consumer Goods",
            Industry::FinancialServices => "Financial Services",
            Industry::Manufacturing => "Manufacturing",
            Industry::Energy => "Energy",
            Industry::RealEstate => "Real Estate",
            Industry::Retail => "Retail",
            Industry::Telecommunications => "Telecommunications",
            Industry::Utilities => "Utilities",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Industry {
    type Err = ValuationError;

    /// Accepts display names, snake_case and kebab-case, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        Industry::ALL
            .into_iter()
            .find(|i| normalize(&i.to_string()) == key)
            .ok_or_else(|| ValuationError::InvalidInput {
                field: "industry".into(),
                reason: format!("Unknown industry '{}'", s.trim()),
            })
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl IndustryBenchmarks {
    /// Sector-default growth path: the high-growth rate fading over the
    /// first three years (100%, 80%, 60%), then the mature rate. Margins
    /// start at the sector average and expand 5% per year, capped at +20%.
    pub fn default_years(&self, years: usize) -> Vec<YearAssumption> {
        (0..years)
            .map(|idx| {
                let revenue_growth_rate = match idx {
                    0 => self.typical_growth_high,
                    1 => self.typical_growth_high * dec!(0.8),
                    2 => self.typical_growth_high * dec!(0.6),
                    _ => self.typical_growth_mature,
                };
                let expansion = (dec!(0.05) * Decimal::from(idx)).min(dec!(0.20));
                YearAssumption {
                    revenue_growth_rate,
                    ebitda_margin: self.ebitda_margin * (Decimal::ONE + expansion),
                }
            })
            .collect()
    }

    /// Growth-driven assumptions prefilled from the sector averages.
    pub fn growth_assumptions(
        &self,
        base_revenue: Money,
        years: usize,
        tax_rate: Rate,
    ) -> GrowthAssumptions {
        GrowthAssumptions {
            base_revenue,
            years: self.default_years(years),
            depreciation: DepreciationMode::PctOfRevenue(self.depreciation_pct_of_revenue),
            capex_pct_of_revenue: self.capex_pct_of_revenue,
            wc_change_pct_of_revenue_growth: self.wc_change_pct_of_revenue_growth,
            tax_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Line up the projected company against its sector.
///
/// Beta and leverage are only known when the discount rate was built from
/// capital-structure inputs.
pub fn compare_to_industry(
    industry: Industry,
    ratios: &FinancialRatios,
    capital: Option<&WaccInput>,
    value_per_share: Money,
) -> BenchmarkComparison {
    let debt_to_equity = match capital {
        Some(w) if !w.equity_weight.is_zero() => Some(w.resolved_debt_weight() / w.equity_weight),
        _ => None,
    };
    let revenue_multiple = if ratios.revenue_per_share.is_zero() {
        None
    } else {
        Some(value_per_share / ratios.revenue_per_share)
    };

    BenchmarkComparison {
        industry,
        benchmarks: industry.benchmarks(),
        ebitda_margin: ratios.avg_ebitda_margin,
        capex_intensity: ratios.avg_capex_intensity,
        beta: capital.map(|w| w.beta),
        debt_to_equity,
        revenue_multiple,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
