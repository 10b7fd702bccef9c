use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::ValuationError;
use crate::types::{with_precision, ComputationOutput, Currency, Money, Precision, Rate};
use crate::valuation::analysis::{assess, InvestmentAssessment, RiskAssessment};
use crate::valuation::dcf::{
    capital_risk, push_valuation_warnings, resolve_discount_rate, value, DiscountRate,
    ValuationResult,
};
use crate::valuation::industry::Industry;
use crate::valuation::projection::{
    free_cash_flows, project_growth, validate_growth, DepreciationMode, GrowthAssumptions,
};
use crate::DcfResult;

use super::perturbation::PerturbationConfig;
use super::statistics::{filter_outliers, summarize, DistributionSummary};

const MAX_TRIALS: u32 = 100_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of trials, 1..=100_000
    #[serde(default = "default_trial_count")]
    pub trial_count: u32,
    /// Seed for the single random stream; same seed, same result
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub perturbation: PerturbationConfig,
    /// Values further than this many standard deviations from the mean are
    /// dropped before summarising
    #[serde(default = "default_outlier_sigma")]
    pub outlier_sigma: f64,
}

fn default_trial_count() -> u32 {
    5_000
}

fn default_seed() -> u64 {
    42
}

fn default_outlier_sigma() -> f64 {
    3.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            trial_count: default_trial_count(),
            seed: default_seed(),
            perturbation: PerturbationConfig::default(),
            outlier_sigma: default_outlier_sigma(),
        }
    }
}

/// Perturbed inputs for one trial, drawn before any evaluation.
#[derive(Debug, Clone, PartialEq)]
struct TrialDraw {
    wacc: f64,
    terminal_growth: f64,
    growth_rates: Vec<f64>,
    ebitda_margins: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub trials_requested: u32,
    /// Trials that satisfied `wacc > terminal growth`
    pub trials_valid: u32,
    pub outliers_removed: u32,
    #[serde(flatten)]
    pub distribution: DistributionSummary,
    /// Retained per-share values, ascending
    pub values: Vec<f64>,
}

/// Input for the stochastic valuation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StochasticInput {
    pub assumptions: GrowthAssumptions,
    pub discount_rate: DiscountRate,
    pub terminal_growth_rate: Rate,
    pub net_debt: Money,
    pub shares_outstanding: Decimal,
    #[serde(default)]
    pub currency: Currency,
    /// Current share price; the assessment is made against the median
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_market_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StochasticOutput {
    pub currency: Currency,
    pub wacc_used: Rate,
    /// Unperturbed valuation
    pub base_case: ValuationResult,
    pub simulation: SimulationSummary,
    /// 10th percentile per-share value
    pub bear: f64,
    /// Median per-share value
    pub base: f64,
    /// 90th percentile per-share value
    pub bull: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    /// Median per-share value against the market price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<InvestmentAssessment>,
}

/// Inputs shared by every trial.
struct TrialContext {
    base_revenue: Money,
    depreciation_pct: Rate,
    capex_pct: Rate,
    wc_change_pct: Rate,
    tax_rate: Rate,
    net_debt: Money,
    shares_outstanding: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value the company under `trial_count` perturbed versions of its
/// assumptions and summarise the per-share values.
///
/// The base `wacc` and `terminal_growth` need not satisfy `wacc > g`
/// themselves; only individual trials are checked, and failing trials are
/// skipped.
pub fn simulate(
    assumptions: &GrowthAssumptions,
    wacc: Rate,
    terminal_growth: Rate,
    net_debt: Money,
    shares_outstanding: Decimal,
    config: &SimulationConfig,
) -> DcfResult<SimulationSummary> {
    validate_config(config)?;
    validate_growth(assumptions)?;
    if shares_outstanding <= Decimal::ZERO {
        return Err(ValuationError::ZeroOrNegativeShareCount(shares_outstanding));
    }
    let depreciation_pct = ratio_depreciation(assumptions)?;

    let ctx = TrialContext {
        base_revenue: assumptions.base_revenue,
        depreciation_pct,
        capex_pct: assumptions.capex_pct_of_revenue,
        wc_change_pct: assumptions.wc_change_pct_of_revenue_growth,
        tax_rate: assumptions.tax_rate,
        net_debt,
        shares_outstanding,
    };

    let draws = draw_trials(assumptions, wacc, terminal_growth, config)?;

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Option<f64>> = draws
        .par_iter()
        .map(|d| evaluate_trial(d, &ctx))
        .collect::<DcfResult<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Option<f64>> = draws
        .iter()
        .map(|d| evaluate_trial(d, &ctx))
        .collect::<DcfResult<Vec<_>>>()?;

    let valid: Vec<f64> = outcomes.into_iter().flatten().collect();
    let (mut retained, removed) = filter_outliers(&valid, config.outlier_sigma);
    retained.sort_by(|a, b| a.total_cmp(b));

    debug!(
        trials = config.trial_count,
        valid = valid.len(),
        outliers = removed,
        "monte carlo trials evaluated"
    );

    let distribution =
        summarize(&retained).ok_or_else(|| ValuationError::DegenerateSimulation {
            trials: config.trial_count,
            valid: valid.len() as u32,
            retained: 0,
        })?;

    Ok(SimulationSummary {
        trials_requested: config.trial_count,
        trials_valid: valid.len() as u32,
        outliers_removed: removed as u32,
        distribution,
        values: retained,
    })
}

/// Deterministic base case plus the simulated distribution.
///
/// The base case must itself satisfy `wacc > terminal growth`; its error is
/// returned before any trial runs.
pub fn valuate_stochastic(
    input: &StochasticInput,
) -> DcfResult<ComputationOutput<StochasticOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (wacc_used, _) = resolve_discount_rate(&input.discount_rate, &mut warnings)?;

    validate_growth(&input.assumptions)?;
    let base_rates = input.assumptions.growth_rates();
    let base_margins = input.assumptions.ebitda_margins();
    let depreciation_pct = ratio_depreciation(&input.assumptions)?;
    let base_projection = project_growth(
        input.assumptions.base_revenue,
        &base_rates,
        &base_margins,
        depreciation_pct,
        input.assumptions.capex_pct_of_revenue,
        input.assumptions.wc_change_pct_of_revenue_growth,
        input.assumptions.tax_rate,
    )?;
    let base_fcf = free_cash_flows(&base_projection);
    let base_case = value(
        &base_fcf,
        wacc_used,
        input.terminal_growth_rate,
        input.net_debt,
        input.shares_outstanding,
    )?;
    push_valuation_warnings(&base_case, &base_fcf, &mut warnings);

    let summary = simulate(
        &input.assumptions,
        wacc_used,
        input.terminal_growth_rate,
        input.net_debt,
        input.shares_outstanding,
        &input.simulation,
    )?;

    let skipped = summary.trials_requested - summary.trials_valid;
    if skipped > 0 {
        warnings.push(format!(
            "{skipped} of {} trials skipped (WACC did not exceed terminal growth)",
            summary.trials_requested
        ));
    }
    if summary.outliers_removed > 0 {
        warnings.push(format!(
            "{} outliers beyond {} standard deviations removed",
            summary.outliers_removed, input.simulation.outlier_sigma
        ));
    }

    let pct = &summary.distribution.percentiles;
    let (bear, base, bull) = (pct.p10, pct.p50, pct.p90);

    let risk = capital_risk(&input.discount_rate, input.industry, &base_fcf);
    let assessment = match input.current_market_price {
        Some(price) => Some(assess(to_decimal("median", base)?, price, &base_projection)?),
        None => None,
    };

    let output = StochasticOutput {
        currency: input.currency.clone(),
        wacc_used,
        base_case,
        simulation: summary,
        bear,
        base,
        bull,
        risk,
        assessment,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_precision(
        Precision::Float64,
        "Monte Carlo DCF with perturbed WACC, growth and margins",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_config(config: &SimulationConfig) -> DcfResult<()> {
    if config.trial_count == 0 || config.trial_count > MAX_TRIALS {
        return Err(ValuationError::InvalidInput {
            field: "trial_count".into(),
            reason: format!(
                "Must be between 1 and {MAX_TRIALS}, got {}",
                config.trial_count
            ),
        });
    }
    if !config.outlier_sigma.is_finite() || config.outlier_sigma <= 0.0 {
        return Err(ValuationError::InvalidInput {
            field: "outlier_sigma".into(),
            reason: format!("Must be a positive number, got {}", config.outlier_sigma),
        });
    }
    Ok(())
}

fn ratio_depreciation(assumptions: &GrowthAssumptions) -> DcfResult<Rate> {
    match &assumptions.depreciation {
        DepreciationMode::PctOfRevenue(pct) => Ok(*pct),
        DepreciationMode::PerYear(_) => Err(ValuationError::InvalidInput {
            field: "depreciation".into(),
            reason: "Simulation requires depreciation as a percentage of revenue".into(),
        }),
    }
}

fn to_f64(field: &str, value: Decimal) -> DcfResult<f64> {
    value.to_f64().ok_or_else(|| ValuationError::InvalidInput {
        field: field.into(),
        reason: format!("{value} is not representable as f64"),
    })
}

fn to_decimal(field: &str, value: f64) -> DcfResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| ValuationError::InvalidInput {
        field: field.into(),
        reason: format!("{value} is not representable as a decimal"),
    })
}

/// Draw every trial from one seeded stream, in trial order: WACC, terminal
/// growth, then growth and margin for each year.
fn draw_trials(
    assumptions: &GrowthAssumptions,
    wacc: Rate,
    terminal_growth: Rate,
    config: &SimulationConfig,
) -> DcfResult<Vec<TrialDraw>> {
    let p = &config.perturbation;
    let base_wacc = to_f64("wacc", wacc)?;
    let base_tg = to_f64("terminal_growth_rate", terminal_growth)?;
    let base_years = assumptions
        .years
        .iter()
        .map(|y| {
            Ok((
                to_f64("revenue_growth_rate", y.revenue_growth_rate)?,
                to_f64("ebitda_margin", y.ebitda_margin)?,
            ))
        })
        .collect::<DcfResult<Vec<(f64, f64)>>>()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut draws = Vec::with_capacity(config.trial_count as usize);
    for _ in 0..config.trial_count {
        let wacc = p.wacc.sample(&mut rng, base_wacc)?;
        let terminal_growth = p.terminal_growth.sample(&mut rng, base_tg)?;
        let mut growth_rates = Vec::with_capacity(base_years.len());
        let mut ebitda_margins = Vec::with_capacity(base_years.len());
        for &(g, m) in &base_years {
            growth_rates.push(p.revenue_growth.sample(&mut rng, g)?);
            ebitda_margins.push(p.ebitda_margin.sample(&mut rng, m)?);
        }
        draws.push(TrialDraw {
            wacc,
            terminal_growth,
            growth_rates,
            ebitda_margins,
        });
    }
    Ok(draws)
}

/// Per-share value for one trial, `None` when `wacc <= terminal growth`.
fn evaluate_trial(draw: &TrialDraw, ctx: &TrialContext) -> DcfResult<Option<f64>> {
    if draw.wacc <= draw.terminal_growth {
        return Ok(None);
    }
    let wacc = to_decimal("wacc", draw.wacc)?;
    let terminal_growth = to_decimal("terminal_growth_rate", draw.terminal_growth)?;
    if wacc <= terminal_growth {
        return Ok(None);
    }
    let growth_rates = draw
        .growth_rates
        .iter()
        .map(|g| to_decimal("revenue_growth_rate", *g))
        .collect::<DcfResult<Vec<_>>>()?;
    let ebitda_margins = draw
        .ebitda_margins
        .iter()
        .map(|m| to_decimal("ebitda_margin", *m))
        .collect::<DcfResult<Vec<_>>>()?;

    let projections = project_growth(
        ctx.base_revenue,
        &growth_rates,
        &ebitda_margins,
        ctx.depreciation_pct,
        ctx.capex_pct,
        ctx.wc_change_pct,
        ctx.tax_rate,
    )?;
    let valuation = value(
        &free_cash_flows(&projections),
        wacc,
        terminal_growth,
        ctx.net_debt,
        ctx.shares_outstanding,
    )?;
    Ok(Some(to_f64("value_per_share", valuation.value_per_share)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::projection::YearAssumption;
    use rust_decimal_macros::dec;

    fn assumptions() -> GrowthAssumptions {
        let years = [
            (dec!(0.15), dec!(0.20)),
            (dec!(0.12), dec!(0.21)),
            (dec!(0.09), dec!(0.22)),
            (dec!(0.08), dec!(0.23)),
            (dec!(0.05), dec!(0.24)),
        ]
        .into_iter()
        .map(|(g, m)| YearAssumption {
            revenue_growth_rate: g,
            ebitda_margin: m,
        })
        .collect();
        GrowthAssumptions {
            base_revenue: dec!(1000),
            years,
            depreciation: DepreciationMode::PctOfRevenue(dec!(0.06)),
            capex_pct_of_revenue: dec!(0.08),
            wc_change_pct_of_revenue_growth: dec!(0.03),
            tax_rate: dec!(0.25),
        }
    }

    fn config(trials: u32) -> SimulationConfig {
        SimulationConfig {
            trial_count: trials,
            ..SimulationConfig::default()
        }
    }

    fn run(trials: u32) -> SimulationSummary {
        simulate(
            &assumptions(),
            dec!(0.10),
            dec!(0.025),
            dec!(10),
            dec!(10),
            &config(trials),
        )
        .unwrap()
    }

    #[test]
    fn test_same_seed_same_summary() {
        let a = run(500);
        let b = run(500);
        assert_eq!(a, b);
        assert_eq!(a.values, b.values);
    }

    #[test]
    fn test_values_ascending_and_serialized() {
        let s = run(200);
        assert!(s.values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(s.values.first().copied(), Some(s.distribution.min));
        assert_eq!(s.values.last().copied(), Some(s.distribution.max));

        let json = serde_json::to_value(&s).unwrap();
        let values = json.get("values").and_then(|v| v.as_array()).unwrap();
        assert_eq!(values.len(), s.distribution.count);
    }

    #[test]
    fn test_different_seed_differs() {
        let a = run(500);
        let mut cfg = config(500);
        cfg.seed = 7;
        let b = simulate(&assumptions(), dec!(0.10), dec!(0.025), dec!(10), dec!(10), &cfg)
            .unwrap();
        assert_ne!(a.distribution.mean, b.distribution.mean);
    }

    #[test]
    fn test_percentile_ordering() {
        let s = run(1_000);
        let p = &s.distribution.percentiles;
        assert!(p.p10 <= p.p25);
        assert!(p.p25 <= p.p50);
        assert!(p.p50 <= p.p75);
        assert!(p.p75 <= p.p90);
        assert!(s.distribution.min <= p.p10 && p.p90 <= s.distribution.max);
    }

    #[test]
    fn test_counts_are_consistent() {
        let s = run(1_000);
        assert_eq!(s.trials_requested, 1_000);
        assert!(s.trials_valid <= s.trials_requested);
        assert_eq!(
            s.distribution.count as u32 + s.outliers_removed,
            s.trials_valid
        );
        assert_eq!(s.values.len(), s.distribution.count);
    }

    #[test]
    fn test_centred_near_base_case() {
        // Deterministic base case is roughly 203 per share.
        let s = run(2_000);
        assert!(
            s.distribution.median > 120.0 && s.distribution.median < 320.0,
            "median {}",
            s.distribution.median
        );
    }

    #[test]
    fn test_trial_count_bounds() {
        for trials in [0, MAX_TRIALS + 1] {
            let err = simulate(
                &assumptions(),
                dec!(0.10),
                dec!(0.025),
                dec!(10),
                dec!(10),
                &config(trials),
            )
            .unwrap_err();
            assert!(matches!(err, ValuationError::InvalidInput { .. }));
        }
    }

    #[test]
    fn test_every_trial_invalid_is_degenerate() {
        // WACC pinned at 5%, terminal growth pinned at 5%: no trial survives.
        let mut cfg = config(50);
        cfg.perturbation.wacc.clamp.max = 0.05;
        cfg.perturbation.terminal_growth.clamp.min = 0.05;
        let err = simulate(&assumptions(), dec!(0.10), dec!(0.025), dec!(10), dec!(10), &cfg)
            .unwrap_err();
        match err {
            ValuationError::DegenerateSimulation { trials, valid, .. } => {
                assert_eq!(trials, 50);
                assert_eq!(valid, 0);
            }
            e => panic!("Expected DegenerateSimulation, got {e:?}"),
        }
    }

    #[test]
    fn test_single_trial() {
        let s = run(1);
        assert_eq!(s.distribution.count, 1);
        assert_eq!(s.distribution.mean, s.distribution.median);
    }

    #[test]
    fn test_per_year_depreciation_rejected() {
        let mut a = assumptions();
        a.depreciation = DepreciationMode::PerYear(vec![dec!(30); 5]);
        assert!(simulate(&a, dec!(0.10), dec!(0.025), dec!(10), dec!(10), &config(10)).is_err());
    }

    #[test]
    fn test_valuate_stochastic_envelope() {
        let input = StochasticInput {
            assumptions: assumptions(),
            discount_rate: DiscountRate::Wacc(dec!(0.10)),
            terminal_growth_rate: dec!(0.025),
            net_debt: dec!(10),
            shares_outstanding: dec!(10),
            currency: Currency::default(),
            current_market_price: None,
            industry: None,
            simulation: config(500),
        };
        let out = valuate_stochastic(&input).unwrap();
        assert_eq!(out.metadata.precision, "ieee754_f64");
        let r = &out.result;
        assert!(r.bear <= r.base && r.base <= r.bull);
        assert!((r.base_case.value_per_share - dec!(203.0548474393825)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_valuate_stochastic_rejects_invalid_base_case() {
        let input = StochasticInput {
            assumptions: assumptions(),
            discount_rate: DiscountRate::Wacc(dec!(0.03)),
            terminal_growth_rate: dec!(0.03),
            net_debt: dec!(10),
            shares_outstanding: dec!(10),
            currency: Currency::default(),
            current_market_price: None,
            industry: None,
            simulation: config(100),
        };
        assert!(matches!(
            valuate_stochastic(&input),
            Err(ValuationError::InvalidTerminalCondition { .. })
        ));
    }

    #[test]
    fn test_valuate_stochastic_assesses_median() {
        let input = StochasticInput {
            assumptions: assumptions(),
            discount_rate: DiscountRate::Wacc(dec!(0.10)),
            terminal_growth_rate: dec!(0.025),
            net_debt: dec!(10),
            shares_outstanding: dec!(10),
            currency: Currency::INR,
            current_market_price: Some(dec!(100)),
            industry: Some(Industry::Technology),
            simulation: config(500),
        };
        let out = valuate_stochastic(&input).unwrap().result;
        assert_eq!(out.currency, Currency::INR);
        // No capital structure, so no beta for a risk score.
        assert!(out.risk.is_none());

        let a = out.assessment.unwrap();
        let median = Decimal::from_f64(out.base).unwrap();
        assert_eq!(a.intrinsic_value, median);
        assert_eq!(a.market_price, dec!(100));
        assert_eq!(a.upside, (median - dec!(100)) / dec!(100));
        assert_ne!(a.intrinsic_value, out.base_case.value_per_share);
    }
}
