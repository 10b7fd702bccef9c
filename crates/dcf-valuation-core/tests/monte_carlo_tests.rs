#![cfg(feature = "monte_carlo")]

use dcf_valuation_core::monte_carlo::perturbation::{DistributionShape, PerturbationConfig};
use dcf_valuation_core::monte_carlo::simulation::{
    simulate, valuate_stochastic, SimulationConfig, StochasticInput,
};
use dcf_valuation_core::monte_carlo::statistics::{filter_outliers, percentile_sorted, summarize};
use dcf_valuation_core::valuation::analysis::Recommendation;
use dcf_valuation_core::valuation::dcf::DiscountRate;
use dcf_valuation_core::valuation::projection::{
    DepreciationMode, GrowthAssumptions, YearAssumption,
};
use dcf_valuation_core::{Currency, ValuationError};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn reference_assumptions() -> GrowthAssumptions {
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

fn stochastic_input(trials: u32, seed: u64) -> StochasticInput {
    StochasticInput {
        assumptions: reference_assumptions(),
        discount_rate: DiscountRate::Wacc(dec!(0.10)),
        terminal_growth_rate: dec!(0.025),
        net_debt: dec!(10),
        shares_outstanding: dec!(10),
        currency: Currency::INR,
        current_market_price: None,
        industry: None,
        simulation: SimulationConfig {
            trial_count: trials,
            seed,
            ..SimulationConfig::default()
        },
    }
}

#[test]
fn test_seeded_runs_are_identical() {
    let a = valuate_stochastic(&stochastic_input(2_000, 42)).unwrap().result;
    let b = valuate_stochastic(&stochastic_input(2_000, 42)).unwrap().result;

    assert_eq!(a.simulation, b.simulation);
    assert_eq!(a.simulation.values, b.simulation.values);
    assert_eq!((a.bear, a.base, a.bull), (b.bear, b.base, b.bull));
}

#[test]
fn test_bands_bracket_median() {
    let out = valuate_stochastic(&stochastic_input(5_000, 42)).unwrap().result;
    assert!(out.bear < out.base);
    assert!(out.base < out.bull);
    assert_eq!(out.base, out.simulation.distribution.median);
    assert!(out.simulation.distribution.probability_positive > 0.9);
}

#[test]
fn test_filtered_values_within_three_sigma() {
    let out = valuate_stochastic(&stochastic_input(5_000, 42)).unwrap();
    let s = &out.result.simulation;
    assert_eq!(
        s.distribution.count as u32 + s.outliers_removed,
        s.trials_valid
    );
    if s.outliers_removed > 0 {
        assert!(out.warnings.iter().any(|w| w.contains("outliers")));
    }
}

#[test]
fn test_injected_outlier_is_removed() {
    let mut values: Vec<f64> = (0..1_000).map(|i| 200.0 + ((i * 37) % 50) as f64).collect();
    values.insert(500, 50_000.0);

    let (kept, removed) = filter_outliers(&values, 3.0);
    assert_eq!(removed, 1);
    assert!(kept.iter().all(|v| *v < 1_000.0));

    let with = summarize(&values).unwrap();
    let without = summarize(&kept).unwrap();
    assert!(without.mean < with.mean);
    assert!(without.std_dev < with.std_dev);

    // Percentiles of the filtered summary equal those of the set with the
    // injected value dropped by hand.
    let mut hand: Vec<f64> = values.iter().copied().filter(|v| *v != 50_000.0).collect();
    hand.sort_by(|a, b| a.total_cmp(b));
    let p = &without.percentiles;
    assert_eq!(
        [p.p10, p.p25, p.p50, p.p75, p.p90],
        [10.0, 25.0, 50.0, 75.0, 90.0].map(|q| percentile_sorted(&hand, q))
    );
    assert_eq!(without.count, hand.len());
    assert_eq!(without.max, hand[hand.len() - 1]);
}

#[test]
fn test_simulated_values_are_ascending() {
    let out = valuate_stochastic(&stochastic_input(1_000, 3)).unwrap().result;
    let values = &out.simulation.values;
    assert_eq!(values.len(), out.simulation.distribution.count);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        percentile_sorted(values, 50.0),
        out.simulation.distribution.median
    );
}

#[test]
fn test_market_price_assessed_against_median() {
    let mut input = stochastic_input(1_000, 42);
    input.current_market_price = Some(dec!(500));
    let out = valuate_stochastic(&input).unwrap().result;

    let a = out.assessment.unwrap();
    assert!(a.upside < dec!(-0.25));
    assert_eq!(a.recommendation, Recommendation::StrongSell);
    assert_eq!(a.market_price, dec!(500));
}

#[test]
fn test_alternate_shape_runs() {
    let mut input = stochastic_input(1_000, 9);
    let mut perturbation = PerturbationConfig::default();
    perturbation.wacc.shape = DistributionShape::Triangular;
    perturbation.revenue_growth.shape = DistributionShape::Uniform;
    input.simulation.perturbation = perturbation;

    let out = valuate_stochastic(&input).unwrap().result;
    assert_eq!(out.simulation.trials_requested, 1_000);
    assert!(out.simulation.distribution.count > 900);
}

#[test]
fn test_base_case_may_violate_terminal_condition_in_simulate() {
    // Base WACC equals terminal growth, but perturbed trials mostly satisfy
    // wacc > g once clamped into their ranges.
    let config = SimulationConfig {
        trial_count: 500,
        ..SimulationConfig::default()
    };
    let s = simulate(
        &reference_assumptions(),
        dec!(0.04),
        dec!(0.04),
        dec!(10),
        dec!(10),
        &config,
    )
    .unwrap();
    assert!(s.trials_valid > 0);
    assert!(s.trials_valid < 500);
}

#[test]
fn test_stochastic_rejects_invalid_shares() {
    let mut input = stochastic_input(100, 1);
    input.shares_outstanding = dec!(0);
    assert!(matches!(
        valuate_stochastic(&input),
        Err(ValuationError::ZeroOrNegativeShareCount(_))
    ));
}

#[test]
fn test_stochastic_input_from_json_defaults() {
    let json = serde_json::json!({
        "assumptions": {
            "base_revenue": "1000",
            "years": [
                { "revenue_growth_rate": "0.10", "ebitda_margin": "0.20" },
                { "revenue_growth_rate": "0.08", "ebitda_margin": "0.22" }
            ],
            "depreciation": { "method": "pct_of_revenue", "value": "0.05" },
            "capex_pct_of_revenue": "0.06",
            "wc_change_pct_of_revenue_growth": "0.02",
            "tax_rate": "0.25"
        },
        "discount_rate": "0.11",
        "terminal_growth_rate": "0.03",
        "net_debt": "0",
        "shares_outstanding": "100"
    });
    let input: StochasticInput = serde_json::from_value(json).unwrap();
    assert_eq!(input.simulation, SimulationConfig::default());
    assert_eq!(input.simulation.trial_count, 5_000);
    assert_eq!(input.simulation.seed, 42);
}
