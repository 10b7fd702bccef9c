use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::time_value::{compound_factors, present_value};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::DcfResult;

use super::analysis::{
    assess, fcf_volatility, financial_ratios, risk_level, FinancialRatios, InvestmentAssessment,
    RiskAssessment,
};
use super::industry::{compare_to_industry, BenchmarkComparison, Industry};
use super::projection::{free_cash_flows, project, ProjectionStrategy, YearProjection};
use super::wacc::{calculate_wacc, WaccInput};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single year's free cash flow and its present value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedCashFlow {
    pub year: u32,
    pub free_cash_flow: Money,
    /// `(1 + wacc)^year`
    pub discount_factor: Decimal,
    pub present_value: Money,
}

/// Result of discounting one FCF sequence. A pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub present_value_of_fcf: Money,
    pub terminal_value: Money,
    pub present_value_of_terminal_value: Money,
    pub enterprise_value: Money,
    pub net_debt: Money,
    pub equity_value: Money,
    pub shares_outstanding: Decimal,
    pub value_per_share: Money,
    /// PV of terminal value as a fraction of enterprise value
    pub terminal_value_pct_of_ev: Rate,
    pub discounted_cash_flows: Vec<DiscountedCashFlow>,
}

/// Discount rate given directly or derived from capital-structure inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiscountRate {
    Wacc(Rate),
    CapitalStructure(WaccInput),
}

/// Input for the non-stochastic valuation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicInput {
    pub projection: ProjectionStrategy,
    pub discount_rate: DiscountRate,
    pub terminal_growth_rate: Rate,
    pub net_debt: Money,
    pub shares_outstanding: Decimal,
    #[serde(default)]
    pub currency: Currency,
    /// Current share price; enables the investment assessment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_market_price: Option<Money>,
    /// Sector of the company; drives the industry risk factor and the
    /// benchmark comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
}

/// Output of the non-stochastic valuation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicOutput {
    /// Reporting currency of every monetary figure
    pub currency: Currency,
    pub wacc_used: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_equity: Option<Rate>,
    pub projections: Vec<YearProjection>,
    pub valuation: ValuationResult,
    /// Horizon ratios; growth-driven projections only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratios: Option<FinancialRatios>,
    /// Risk score; requires capital-structure inputs for beta and leverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<InvestmentAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkComparison>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Discount a free-cash-flow sequence and a Gordon-growth terminal value.
///
/// Rejects `wacc <= terminal_growth_rate` and a non-positive share count
/// instead of computing a meaningless terminal value or per-share figure.
pub fn value(
    fcf: &[Money],
    wacc: Rate,
    terminal_growth_rate: Rate,
    net_debt: Money,
    shares_outstanding: Decimal,
) -> DcfResult<ValuationResult> {
    let last_fcf = *fcf.last().ok_or_else(|| ValuationError::InvalidInput {
        field: "fcf".into(),
        reason: "At least one free cash flow is required".into(),
    })?;
    if wacc <= terminal_growth_rate {
        return Err(ValuationError::InvalidTerminalCondition {
            wacc,
            terminal_growth: terminal_growth_rate,
        });
    }
    if shares_outstanding <= Decimal::ZERO {
        return Err(ValuationError::ZeroOrNegativeShareCount(shares_outstanding));
    }

    let factors = compound_factors(wacc, fcf.len())?;
    let mut discounted_cash_flows = Vec::with_capacity(fcf.len());
    for (idx, (&cf, &factor)) in fcf.iter().zip(&factors).enumerate() {
        discounted_cash_flows.push(DiscountedCashFlow {
            year: idx as u32 + 1,
            free_cash_flow: cf,
            discount_factor: factor,
            present_value: present_value(cf, factor)?,
        });
    }
    let present_value_of_fcf: Money = discounted_cash_flows.iter().map(|d| d.present_value).sum();

    let terminal_fcf = last_fcf * (Decimal::ONE + terminal_growth_rate);
    let terminal_value = terminal_fcf / (wacc - terminal_growth_rate);
    let horizon_factor = factors[factors.len() - 1];
    let present_value_of_terminal_value = present_value(terminal_value, horizon_factor)?;

    let enterprise_value = present_value_of_fcf + present_value_of_terminal_value;
    let equity_value = enterprise_value - net_debt;
    let value_per_share = equity_value / shares_outstanding;

    let terminal_value_pct_of_ev = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        present_value_of_terminal_value / enterprise_value
    };

    Ok(ValuationResult {
        present_value_of_fcf,
        terminal_value,
        present_value_of_terminal_value,
        enterprise_value,
        net_debt,
        equity_value,
        shares_outstanding,
        value_per_share,
        terminal_value_pct_of_ev,
        discounted_cash_flows,
    })
}

/// Run the full deterministic valuation: resolve WACC, project, discount.
pub fn valuate_deterministic(
    input: &DeterministicInput,
) -> DcfResult<ComputationOutput<DeterministicOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (wacc_used, cost_of_equity) = resolve_discount_rate(&input.discount_rate, &mut warnings)?;

    let projections = project(&input.projection)?;
    let fcf = free_cash_flows(&projections);
    let valuation = value(
        &fcf,
        wacc_used,
        input.terminal_growth_rate,
        input.net_debt,
        input.shares_outstanding,
    )?;

    push_valuation_warnings(&valuation, &fcf, &mut warnings);

    let ratios = match &input.projection {
        ProjectionStrategy::GrowthDriven(a) => Some(financial_ratios(
            &projections,
            a.base_revenue,
            input.shares_outstanding,
        )?),
        ProjectionStrategy::Manual(_) => None,
    };
    let risk = capital_risk(&input.discount_rate, input.industry, &fcf);
    let assessment = match input.current_market_price {
        Some(price) => Some(assess(valuation.value_per_share, price, &projections)?),
        None => None,
    };
    let benchmark = match (input.industry, &ratios) {
        (Some(industry), Some(r)) => Some(compare_to_industry(
            industry,
            r,
            capital_structure(&input.discount_rate),
            valuation.value_per_share,
        )),
        _ => None,
    };

    let output = DeterministicOutput {
        currency: input.currency.clone(),
        wacc_used,
        cost_of_equity,
        projections,
        valuation,
        ratios,
        risk,
        assessment,
        benchmark,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "FCFF DCF with Gordon growth terminal value",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Returns (wacc, Option<cost_of_equity>).
pub(crate) fn resolve_discount_rate(
    rate: &DiscountRate,
    warnings: &mut Vec<String>,
) -> DcfResult<(Rate, Option<Rate>)> {
    match rate {
        DiscountRate::Wacc(w) => {
            if *w <= dec!(-1) {
                return Err(ValuationError::InvalidInput {
                    field: "wacc".into(),
                    reason: "WACC must be greater than -100%".into(),
                });
            }
            Ok((*w, None))
        }
        DiscountRate::CapitalStructure(wacc_input) => {
            let out = calculate_wacc(wacc_input)?;
            for w in &out.warnings {
                warnings.push(format!("[WACC] {w}"));
            }
            Ok((out.result.wacc, Some(out.result.cost_of_equity)))
        }
    }
}

fn capital_structure(rate: &DiscountRate) -> Option<&WaccInput> {
    match rate {
        DiscountRate::CapitalStructure(w) => Some(w),
        DiscountRate::Wacc(_) => None,
    }
}

/// Risk score, available only when beta and leverage are known.
pub(crate) fn capital_risk(
    rate: &DiscountRate,
    industry: Option<Industry>,
    fcf: &[Money],
) -> Option<RiskAssessment> {
    capital_structure(rate).map(|w| {
        risk_level(
            w.beta,
            industry.is_some_and(Industry::is_high_risk),
            w.resolved_debt_weight(),
            fcf_volatility(fcf),
        )
    })
}

pub(crate) fn push_valuation_warnings(
    valuation: &ValuationResult,
    fcf: &[Money],
    warnings: &mut Vec<String>,
) {
    if valuation.terminal_value_pct_of_ev > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            valuation.terminal_value_pct_of_ev * dec!(100)
        ));
    }
    if fcf.last().is_some_and(|cf| *cf <= Decimal::ZERO) {
        warnings.push(
            "Final-year free cash flow is not positive; terminal value is zero or negative".into(),
        );
    }
    if valuation.equity_value < Decimal::ZERO {
        warnings.push(format!(
            "Net debt ({}) exceeds enterprise value; equity value is negative",
            valuation.net_debt
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
