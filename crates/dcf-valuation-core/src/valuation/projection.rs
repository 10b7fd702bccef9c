use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Growth and margin assumptions for one explicit forecast year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearAssumption {
    /// Revenue growth over the prior year (may be negative)
    pub revenue_growth_rate: Rate,
    pub ebitda_margin: Rate,
}

/// How depreciation is derived in the growth-driven projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "value", rename_all = "snake_case")]
pub enum DepreciationMode {
    /// Flat ratio of the year's revenue
    PctOfRevenue(Rate),
    /// Supplied directly, one amount per forecast year
    PerYear(Vec<Money>),
}

/// Revenue compounded from a base year by per-year growth rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthAssumptions {
    /// Base (year 0) revenue
    pub base_revenue: Money,
    /// One entry per forecast year; length is the horizon N
    pub years: Vec<YearAssumption>,
    pub depreciation: DepreciationMode,
    pub capex_pct_of_revenue: Rate,
    /// Working-capital change as a fraction of the year's revenue increase
    /// driven by growth (`revenue * growth * pct`)
    pub wc_change_pct_of_revenue_growth: Rate,
    pub tax_rate: Rate,
}

impl GrowthAssumptions {
    pub fn growth_rates(&self) -> Vec<Rate> {
        self.years.iter().map(|y| y.revenue_growth_rate).collect()
    }

    pub fn ebitda_margins(&self) -> Vec<Rate> {
        self.years.iter().map(|y| y.ebitda_margin).collect()
    }
}

/// Directly entered figures for one forecast year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualYear {
    pub revenue: Money,
    pub ebitda_margin: Rate,
    pub capex: Money,
    pub depreciation: Money,
    pub working_capital_change: Money,
}

/// Per-year figures entered by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAssumptions {
    pub years: Vec<ManualYear>,
    pub tax_rate: Rate,
}

/// The two projection input modes.
///
/// They differ in working-capital treatment: `GrowthDriven` charges no
/// working-capital change in year 1, `Manual` charges the supplied amount
/// every year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ProjectionStrategy {
    GrowthDriven(GrowthAssumptions),
    Manual(ManualAssumptions),
}

/// One projected year. Derived wholesale from the assumptions and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    /// 1-indexed forecast year
    pub year: u32,
    pub revenue: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub taxes: Money,
    pub nopat: Money,
    pub capex: Money,
    pub working_capital_change: Money,
    pub free_cash_flow: Money,
}

/// Enveloped projection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub projections: Vec<YearProjection>,
    pub total_free_cash_flow: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the year-by-year projection for either strategy.
pub fn project(strategy: &ProjectionStrategy) -> DcfResult<Vec<YearProjection>> {
    match strategy {
        ProjectionStrategy::GrowthDriven(a) => {
            validate_growth(a)?;
            let dep = DepreciationSource::from_mode(&a.depreciation);
            Ok(build_growth_years(
                a.base_revenue,
                &a.growth_rates(),
                &a.ebitda_margins(),
                dep,
                a.capex_pct_of_revenue,
                a.wc_change_pct_of_revenue_growth,
                a.tax_rate,
            ))
        }
        ProjectionStrategy::Manual(a) => {
            validate_manual(a)?;
            Ok(build_manual_years(a))
        }
    }
}

/// Growth-driven projection in positional form with ratio depreciation.
///
/// Inputs are not re-validated beyond length agreement; the Monte Carlo
/// simulator calls this once per trial with already-clamped draws.
#[allow(clippy::too_many_arguments)]
pub fn project_growth(
    base_revenue: Money,
    growth_rates: &[Rate],
    ebitda_margins: &[Rate],
    depreciation_pct: Rate,
    capex_pct: Rate,
    wc_change_pct: Rate,
    tax_rate: Rate,
) -> DcfResult<Vec<YearProjection>> {
    if growth_rates.is_empty() {
        return Err(ValuationError::InvalidInput {
            field: "growth_rates".into(),
            reason: "At least one forecast year is required".into(),
        });
    }
    if growth_rates.len() != ebitda_margins.len() {
        return Err(ValuationError::InvalidInput {
            field: "ebitda_margins".into(),
            reason: format!(
                "Expected {} margins to match growth rates, got {}",
                growth_rates.len(),
                ebitda_margins.len()
            ),
        });
    }
    Ok(build_growth_years(
        base_revenue,
        growth_rates,
        ebitda_margins,
        DepreciationSource::Ratio(depreciation_pct),
        capex_pct,
        wc_change_pct,
        tax_rate,
    ))
}

/// Project and wrap the result in the standard output envelope.
pub fn calculate_projection(
    strategy: &ProjectionStrategy,
) -> DcfResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let projections = project(strategy)?;

    let negative_years: Vec<u32> = projections
        .iter()
        .filter(|p| p.free_cash_flow < Decimal::ZERO)
        .map(|p| p.year)
        .collect();
    if !negative_years.is_empty() {
        warnings.push(format!(
            "Negative free cash flow projected in year(s) {negative_years:?}"
        ));
    }

    let methodology = match strategy {
        ProjectionStrategy::GrowthDriven(_) => "Growth-driven FCF projection",
        ProjectionStrategy::Manual(_) => "Manual per-year FCF projection",
    };
    let total_free_cash_flow = projections.iter().map(|p| p.free_cash_flow).sum();
    let output = ProjectionOutput {
        projections,
        total_free_cash_flow,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, strategy, warnings, elapsed, output))
}

/// Extract the free cash flow sequence from a projection.
pub fn free_cash_flows(projections: &[YearProjection]) -> Vec<Money> {
    projections.iter().map(|p| p.free_cash_flow).collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

enum DepreciationSource<'a> {
    Ratio(Rate),
    Amounts(&'a [Money]),
}

impl<'a> DepreciationSource<'a> {
    fn from_mode(mode: &'a DepreciationMode) -> Self {
        match mode {
            DepreciationMode::PctOfRevenue(pct) => DepreciationSource::Ratio(*pct),
            DepreciationMode::PerYear(amounts) => DepreciationSource::Amounts(amounts),
        }
    }

    fn for_year(&self, idx: usize, revenue: Money) -> Money {
        match self {
            DepreciationSource::Ratio(pct) => revenue * pct,
            DepreciationSource::Amounts(amounts) => amounts[idx],
        }
    }
}

/// Taxes are levied only on positive EBIT; losses carry no tax shield.
fn operating_taxes(ebit: Money, tax_rate: Rate) -> Money {
    ebit.max(Decimal::ZERO) * tax_rate
}

fn build_growth_years(
    base_revenue: Money,
    growth_rates: &[Rate],
    ebitda_margins: &[Rate],
    depreciation: DepreciationSource<'_>,
    capex_pct: Rate,
    wc_change_pct: Rate,
    tax_rate: Rate,
) -> Vec<YearProjection> {
    let mut projections = Vec::with_capacity(growth_rates.len());
    let mut prev_revenue = base_revenue;

    for (idx, (&growth, &margin)) in growth_rates.iter().zip(ebitda_margins).enumerate() {
        let revenue = prev_revenue * (Decimal::ONE + growth);
        let ebitda = revenue * margin;
        let dep = depreciation.for_year(idx, revenue);
        let ebit = ebitda - dep;
        let taxes = operating_taxes(ebit, tax_rate);
        let nopat = ebit - taxes;
        let capex = revenue * capex_pct;
        // No working-capital drag in the first forecast year.
        let wc_change = if idx == 0 {
            Decimal::ZERO
        } else {
            revenue * growth * wc_change_pct
        };
        let free_cash_flow = nopat + dep - capex - wc_change;

        projections.push(YearProjection {
            year: idx as u32 + 1,
            revenue,
            ebitda,
            depreciation: dep,
            ebit,
            taxes,
            nopat,
            capex,
            working_capital_change: wc_change,
            free_cash_flow,
        });

        prev_revenue = revenue;
    }

    projections
}

fn build_manual_years(input: &ManualAssumptions) -> Vec<YearProjection> {
    input
        .years
        .iter()
        .enumerate()
        .map(|(idx, y)| {
            let ebitda = y.revenue * y.ebitda_margin;
            let ebit = ebitda - y.depreciation;
            let taxes = operating_taxes(ebit, input.tax_rate);
            let nopat = ebit - taxes;
            YearProjection {
                year: idx as u32 + 1,
                revenue: y.revenue,
                ebitda,
                depreciation: y.depreciation,
                ebit,
                taxes,
                nopat,
                capex: y.capex,
                working_capital_change: y.working_capital_change,
                free_cash_flow: nopat + y.depreciation - y.capex - y.working_capital_change,
            }
        })
        .collect()
}

fn validate_rate_in_unit(field: &str, value: Rate) -> DcfResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ValuationError::InvalidInput {
            field: field.into(),
            reason: format!("Must be between 0 and 1, got {value}"),
        });
    }
    Ok(())
}

pub(crate) fn validate_growth(input: &GrowthAssumptions) -> DcfResult<()> {
    if input.base_revenue <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "base_revenue".into(),
            reason: "Base revenue must be positive".into(),
        });
    }
    if input.years.is_empty() {
        return Err(ValuationError::InvalidInput {
            field: "years".into(),
            reason: "At least one forecast year is required".into(),
        });
    }
    for (idx, y) in input.years.iter().enumerate() {
        if y.revenue_growth_rate <= -Decimal::ONE {
            return Err(ValuationError::InvalidInput {
                field: format!("years[{idx}].revenue_growth_rate"),
                reason: "Growth rate must be greater than -100%".into(),
            });
        }
        validate_rate_in_unit(&format!("years[{idx}].ebitda_margin"), y.ebitda_margin)?;
    }
    match &input.depreciation {
        DepreciationMode::PctOfRevenue(pct) => validate_rate_in_unit("depreciation", *pct)?,
        DepreciationMode::PerYear(amounts) => {
            if amounts.len() != input.years.len() {
                return Err(ValuationError::InvalidInput {
                    field: "depreciation".into(),
                    reason: format!(
                        "Expected {} per-year amounts, got {}",
                        input.years.len(),
                        amounts.len()
                    ),
                });
            }
            if amounts.iter().any(|d| *d < Decimal::ZERO) {
                return Err(ValuationError::InvalidInput {
                    field: "depreciation".into(),
                    reason: "Depreciation cannot be negative".into(),
                });
            }
        }
    }
    validate_rate_in_unit("capex_pct_of_revenue", input.capex_pct_of_revenue)?;
    validate_rate_in_unit(
        "wc_change_pct_of_revenue_growth",
        input.wc_change_pct_of_revenue_growth,
    )?;
    validate_rate_in_unit("tax_rate", input.tax_rate)
}

fn validate_manual(input: &ManualAssumptions) -> DcfResult<()> {
    if input.years.is_empty() {
        return Err(ValuationError::InvalidInput {
            field: "years".into(),
            reason: "At least one forecast year is required".into(),
        });
    }
    for (idx, y) in input.years.iter().enumerate() {
        if y.revenue < Decimal::ZERO {
            return Err(ValuationError::InvalidInput {
                field: format!("years[{idx}].revenue"),
                reason: "Revenue cannot be negative".into(),
            });
        }
        validate_rate_in_unit(&format!("years[{idx}].ebitda_margin"), y.ebitda_margin)?;
        if y.capex < Decimal::ZERO || y.depreciation < Decimal::ZERO {
            return Err(ValuationError::InvalidInput {
                field: format!("years[{idx}]"),
                reason: "Capex and depreciation cannot be negative".into(),
            });
        }
    }
    validate_rate_in_unit("tax_rate", input.tax_rate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
