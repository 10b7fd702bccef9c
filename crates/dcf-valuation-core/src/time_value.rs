use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Compounding factors `(1 + rate)^t` for `t = 1..=periods`.
///
/// Built by iterative multiplication rather than `powd` so integer periods
/// stay exact.
pub fn compound_factors(rate: Rate, periods: usize) -> DcfResult<Vec<Decimal>> {
    if rate <= dec!(-1) {
        return Err(ValuationError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    let mut factors = Vec::with_capacity(periods);
    for _ in 0..periods {
        factor *= one_plus_r;
        factors.push(factor);
    }
    Ok(factors)
}

/// Present value of an end-of-period amount given its compounding factor.
pub fn present_value(amount: Money, factor: Decimal) -> DcfResult<Money> {
    if factor.is_zero() {
        return Err(ValuationError::DivisionByZero {
            context: "present value discount factor".into(),
        });
    }
    Ok(amount / factor)
}

/// Compound annual growth rate between two values over `periods` years.
pub fn cagr(start: Money, end: Money, periods: u32) -> DcfResult<Rate> {
    if periods == 0 {
        return Err(ValuationError::InvalidInput {
            field: "periods".into(),
            reason: "CAGR requires at least one period".into(),
        });
    }
    if start <= Decimal::ZERO || end < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "start / end".into(),
            reason: "CAGR requires a positive start value and non-negative end value".into(),
        });
    }
    let ratio = end / start;
    let growth = if periods == 1 || ratio.is_zero() {
        ratio
    } else {
        ratio.powd(Decimal::ONE / Decimal::from(periods))
    };
    Ok(growth - Decimal::ONE)
}
