use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::DcfResult;

/// Weights within this distance of summing to 1.0 are treated as complementary.
const WEIGHT_TOLERANCE: Decimal = dec!(0.000001);

/// Upper bound for the collaborator-supplied risk-free rate (20%).
const MAX_RISK_FREE_RATE: Rate = dec!(0.20);

/// Capital-structure assumptions for a single valuation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccInput {
    /// Risk-free rate (10-year government bond yield), as a fraction
    pub risk_free_rate: Rate,
    /// Levered equity beta
    pub beta: Decimal,
    /// Equity (market) risk premium
    pub equity_risk_premium: Rate,
    /// Pre-tax cost of debt
    pub cost_of_debt: Rate,
    /// Marginal corporate tax rate
    pub tax_rate: Rate,
    /// Weight of equity in capital structure
    pub equity_weight: Rate,
    /// Weight of debt in capital structure; defaults to `1 - equity_weight`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_weight: Option<Rate>,
}

impl WaccInput {
    pub fn resolved_debt_weight(&self) -> Rate {
        self.debt_weight
            .unwrap_or(Decimal::ONE - self.equity_weight)
    }
}

/// Output of the WACC calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc: Rate,
    /// Cost of equity via CAPM
    pub cost_of_equity: Rate,
    pub after_tax_cost_of_debt: Rate,
    /// Pre-tax cost of debt (echoed back)
    pub cost_of_debt_pretax: Rate,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
}

/// CAPM cost of equity: `Ke = Rf + beta * ERP`.
///
/// No bounds are enforced here; [`calculate_wacc`] validates beta before
/// reaching this formula.
pub fn cost_of_equity(risk_free_rate: Rate, beta: Decimal, equity_risk_premium: Rate) -> Rate {
    risk_free_rate + beta * equity_risk_premium
}

/// Weighted average cost of capital:
/// `WACC = We * Ke + Wd * Kd * (1 - t)`.
///
/// The caller guarantees `equity_weight + debt_weight = 1`.
pub fn wacc(
    equity_weight: Rate,
    cost_of_equity: Rate,
    debt_weight: Rate,
    pretax_cost_of_debt: Rate,
    tax_rate: Rate,
) -> Rate {
    equity_weight * cost_of_equity + debt_weight * pretax_cost_of_debt * (Decimal::ONE - tax_rate)
}

/// Calculate the Weighted Average Cost of Capital using CAPM, validating the
/// capital structure first.
pub fn calculate_wacc(input: &WaccInput) -> DcfResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_wacc_input(input)?;

    let debt_weight = input.resolved_debt_weight();
    let ke = cost_of_equity(input.risk_free_rate, input.beta, input.equity_risk_premium);
    let after_tax_cost_of_debt = input.cost_of_debt * (Decimal::ONE - input.tax_rate);
    let wacc = wacc(
        input.equity_weight,
        ke,
        debt_weight,
        input.cost_of_debt,
        input.tax_rate,
    );

    // --- Reasonableness warnings ---
    if input.beta > dec!(3.0) {
        warnings.push(format!(
            "High beta ({}): verify market data; betas above 3.0 are unusual",
            input.beta
        ));
    }
    if input.equity_risk_premium > dec!(0.10) {
        warnings.push(format!(
            "Equity risk premium ({}) exceeds 10%; verify estimate",
            input.equity_risk_premium
        ));
    }
    if wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {wacc} exceeds 20%; appropriate for high-risk / emerging-market situations only"
        ));
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity: ke,
        after_tax_cost_of_debt,
        cost_of_debt_pretax: input.cost_of_debt,
        equity_weight: input.equity_weight,
        debt_weight,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "WACC via CAPM",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Convert the risk-free rate collaborator's percentage (e.g. `4.4`) into a
/// fraction, rejecting values outside the 0–20% domain.
pub fn risk_free_rate_from_percent(pct: Decimal) -> DcfResult<Rate> {
    let rate = pct / dec!(100);
    if rate < Decimal::ZERO || rate > MAX_RISK_FREE_RATE {
        return Err(ValuationError::InvalidCapitalStructure(format!(
            "Risk-free rate must be between 0% and 20%, got {pct}%"
        )));
    }
    Ok(rate)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_wacc_input(input: &WaccInput) -> DcfResult<()> {
    if input.risk_free_rate < Decimal::ZERO || input.risk_free_rate > MAX_RISK_FREE_RATE {
        return Err(ValuationError::InvalidCapitalStructure(format!(
            "Risk-free rate must be between 0 and 0.20, got {}",
            input.risk_free_rate
        )));
    }
    if input.equity_risk_premium < Decimal::ZERO {
        return Err(ValuationError::InvalidCapitalStructure(
            "Equity risk premium cannot be negative".into(),
        ));
    }
    if input.beta < Decimal::ZERO || input.beta > dec!(5) {
        return Err(ValuationError::InvalidCapitalStructure(format!(
            "Beta must be between 0 and 5, got {}",
            input.beta
        )));
    }
    if input.cost_of_debt < Decimal::ZERO {
        return Err(ValuationError::InvalidCapitalStructure(
            "Cost of debt cannot be negative".into(),
        ));
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(ValuationError::InvalidCapitalStructure(
            "Tax rate must be between 0 and 1".into(),
        ));
    }

    let debt_weight = input.resolved_debt_weight();
    let in_unit = |w: Rate| w >= Decimal::ZERO && w <= Decimal::ONE;
    if !in_unit(input.equity_weight) || !in_unit(debt_weight) {
        return Err(ValuationError::InvalidCapitalStructure(
            "Capital structure weights must lie between 0 and 1".into(),
        ));
    }
    let weight_sum = input.equity_weight + debt_weight;
    if (weight_sum - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
        return Err(ValuationError::InvalidCapitalStructure(format!(
            "Equity and debt weights must sum to 1.0, got {weight_sum}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
