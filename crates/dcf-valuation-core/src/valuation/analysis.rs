use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::time_value::cagr;
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::projection::YearProjection;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Summary ratios over the explicit forecast horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    /// Revenue CAGR from the base year to the final forecast year
    pub revenue_cagr: Rate,
    pub avg_ebitda_margin: Rate,
    pub avg_fcf_margin: Rate,
    pub avg_capex_intensity: Rate,
    pub fcf_per_share: Money,
    pub revenue_per_share: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

/// Intrinsic value compared against the current market price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAssessment {
    pub intrinsic_value: Money,
    pub market_price: Money,
    /// (intrinsic - price) / price
    pub upside: Rate,
    pub recommendation: Recommendation,
    /// Coefficient of variation of the projected free cash flows
    pub fcf_volatility: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Horizon-level ratios from a projection. Years with zero revenue are
/// excluded from the margin averages.
pub fn financial_ratios(
    projections: &[YearProjection],
    base_revenue: Money,
    shares_outstanding: Decimal,
) -> DcfResult<FinancialRatios> {
    let last = projections.last().ok_or_else(|| ValuationError::InvalidInput {
        field: "projections".into(),
        reason: "At least one projected year is required".into(),
    })?;
    if shares_outstanding <= Decimal::ZERO {
        return Err(ValuationError::ZeroOrNegativeShareCount(shares_outstanding));
    }

    let revenue_cagr = cagr(base_revenue, last.revenue, projections.len() as u32)?;

    let with_revenue: Vec<&YearProjection> = projections
        .iter()
        .filter(|p| p.revenue > Decimal::ZERO)
        .collect();
    let avg = |f: fn(&YearProjection) -> Money| -> Rate {
        if with_revenue.is_empty() {
            return Decimal::ZERO;
        }
        let total: Rate = with_revenue.iter().map(|p| f(*p) / p.revenue).sum();
        total / Decimal::from(with_revenue.len())
    };

    Ok(FinancialRatios {
        revenue_cagr,
        avg_ebitda_margin: avg(|p| p.ebitda),
        avg_fcf_margin: avg(|p| p.free_cash_flow),
        avg_capex_intensity: avg(|p| p.capex),
        fcf_per_share: last.free_cash_flow / shares_outstanding,
        revenue_per_share: last.revenue / shares_outstanding,
    })
}

/// Coefficient of variation of the FCF sequence (population std / mean).
///
/// Returns 0.5 when the mean is not positive, where dispersion relative to
/// the mean is meaningless.
pub fn fcf_volatility(fcf: &[Money]) -> Decimal {
    if fcf.is_empty() {
        return dec!(0.5);
    }
    let n = Decimal::from(fcf.len());
    let mean = fcf.iter().copied().sum::<Decimal>() / n;
    if mean <= Decimal::ZERO {
        return dec!(0.5);
    }
    let variance = fcf.iter().map(|cf| (cf - mean) * (cf - mean)).sum::<Decimal>() / n;
    variance.sqrt().unwrap_or(Decimal::ZERO) / mean
}

/// Additive risk score from market, sector, leverage and cash-flow factors.
///
/// `debt_ratio` is the debt weight as a fraction (0.35 = 35%).
pub fn risk_level(
    beta: Decimal,
    high_risk_industry: bool,
    debt_ratio: Rate,
    fcf_volatility: Decimal,
) -> RiskAssessment {
    let mut score = 0;

    score += if beta > dec!(1.5) {
        3
    } else if beta > dec!(1.2) {
        2
    } else if beta > dec!(0.8) {
        1
    } else {
        0
    };

    if high_risk_industry {
        score += 2;
    }

    score += if debt_ratio > dec!(0.50) {
        2
    } else if debt_ratio > dec!(0.30) {
        1
    } else {
        0
    };

    score += if fcf_volatility > dec!(0.30) {
        2
    } else if fcf_volatility > dec!(0.15) {
        1
    } else {
        0
    };

    let level = match score {
        s if s >= 7 => RiskLevel::VeryHigh,
        s if s >= 5 => RiskLevel::High,
        s if s >= 3 => RiskLevel::Moderate,
        _ => RiskLevel::Low,
    };

    RiskAssessment { score, level }
}

/// Map upside versus the market price to a recommendation band.
pub fn recommend(intrinsic_value: Money, market_price: Money) -> DcfResult<(Rate, Recommendation)> {
    if market_price <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "market_price".into(),
            reason: "Market price must be positive".into(),
        });
    }
    let upside = (intrinsic_value - market_price) / market_price;
    let rec = if upside > dec!(0.20) {
        Recommendation::StrongBuy
    } else if upside > dec!(0.10) {
        Recommendation::Buy
    } else if upside > dec!(-0.10) {
        Recommendation::Hold
    } else if upside > dec!(-0.25) {
        Recommendation::Sell
    } else {
        Recommendation::StrongSell
    };
    Ok((upside, rec))
}

pub fn assess(
    intrinsic_value: Money,
    market_price: Money,
    projections: &[YearProjection],
) -> DcfResult<InvestmentAssessment> {
    let (upside, recommendation) = recommend(intrinsic_value, market_price)?;
    let fcf: Vec<Money> = projections.iter().map(|p| p.free_cash_flow).collect();
    Ok(InvestmentAssessment {
        intrinsic_value,
        market_price,
        upside,
        recommendation,
        fcf_volatility: fcf_volatility(&fcf),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
