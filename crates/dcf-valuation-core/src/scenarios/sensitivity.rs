use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::ValuationError;
use crate::types::*;
use crate::valuation::dcf::{resolve_discount_rate, value, DiscountRate};
use crate::valuation::projection::{free_cash_flows, project, ProjectionStrategy};
use crate::DcfResult;

/// How the default ranges are laid out around the base case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Points per axis, at least 2
    pub steps: usize,
    pub wacc_low_multiplier: Decimal,
    pub wacc_high_multiplier: Decimal,
    pub growth_low_multiplier: Decimal,
    pub growth_high_multiplier: Decimal,
    /// Ceiling on the highest terminal growth rate tested
    pub growth_cap: Rate,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        SensitivityConfig {
            steps: 11,
            wacc_low_multiplier: dec!(0.7),
            wacc_high_multiplier: dec!(1.3),
            growth_low_multiplier: dec!(0.5),
            growth_high_multiplier: dec!(2.0),
            growth_cap: dec!(0.05),
        }
    }
}

/// The two axes of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRanges {
    pub wacc: Vec<Rate>,
    pub terminal_growth: Vec<Rate>,
}

impl SensitivityRanges {
    /// `wacc × [low, high]` and `g × [low, min(high, cap)]`.
    pub fn around(
        wacc: Rate,
        terminal_growth: Rate,
        config: &SensitivityConfig,
    ) -> DcfResult<Self> {
        if config.steps < 2 {
            return Err(ValuationError::InvalidInput {
                field: "steps".into(),
                reason: format!("At least 2 steps are required, got {}", config.steps),
            });
        }
        let growth_high = (terminal_growth * config.growth_high_multiplier).min(config.growth_cap);
        Ok(SensitivityRanges {
            wacc: linspace(
                wacc * config.wacc_low_multiplier,
                wacc * config.wacc_high_multiplier,
                config.steps,
            ),
            terminal_growth: linspace(
                terminal_growth * config.growth_low_multiplier,
                growth_high,
                config.steps,
            ),
        })
    }
}

/// Input for a WACC × terminal growth sensitivity run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub projection: ProjectionStrategy,
    pub discount_rate: DiscountRate,
    pub terminal_growth_rate: Rate,
    pub net_debt: Money,
    pub shares_outstanding: Decimal,
    #[serde(default)]
    pub config: SensitivityConfig,
    /// Explicit axes; replace the ranges derived from `config`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<SensitivityRanges>,
}

/// Value per share for every (WACC, terminal growth) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub wacc_values: Vec<Rate>,
    pub terminal_growth_values: Vec<Rate>,
    /// `cells[i][j]` is the value at `wacc_values[i]`, `terminal_growth_values[j]`;
    /// `None` where WACC does not exceed terminal growth
    pub cells: Vec<Vec<Option<Money>>>,
    /// Grid cell closest to the base case (row, col)
    pub base_case_position: (usize, usize),
    pub base_case_value: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `steps` evenly spaced values from `min` to `max`, both inclusive.
pub fn linspace(min: Decimal, max: Decimal, steps: usize) -> Vec<Decimal> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / Decimal::from(steps - 1);
            let mut values: Vec<Decimal> = (0..steps - 1)
                .map(|i| min + step * Decimal::from(i))
                .collect();
            values.push(max);
            values
        }
    }
}

/// Value an FCF sequence at every (WACC, terminal growth) pair.
///
/// Rows follow `wacc_range`, columns follow `terminal_growth_range`. Cells
/// where the pair cannot be valued are `None`; only problems with the static
/// inputs are returned as errors.
pub fn grid(
    fcf: &[Money],
    net_debt: Money,
    shares_outstanding: Decimal,
    wacc_range: &[Rate],
    terminal_growth_range: &[Rate],
) -> DcfResult<Vec<Vec<Option<Money>>>> {
    if fcf.is_empty() {
        return Err(ValuationError::InvalidInput {
            field: "fcf".into(),
            reason: "At least one free cash flow is required".into(),
        });
    }
    if wacc_range.is_empty() || terminal_growth_range.is_empty() {
        return Err(ValuationError::InvalidInput {
            field: "ranges".into(),
            reason: "Both sensitivity ranges must contain at least one value".into(),
        });
    }
    if shares_outstanding <= Decimal::ZERO {
        return Err(ValuationError::ZeroOrNegativeShareCount(shares_outstanding));
    }

    let row = |w: &Rate| -> Vec<Option<Money>> {
        terminal_growth_range
            .iter()
            .map(|tg| {
                if w <= tg {
                    return None;
                }
                value(fcf, *w, *tg, net_debt, shares_outstanding)
                    .ok()
                    .map(|v| v.value_per_share)
            })
            .collect()
    };

    #[cfg(feature = "parallel")]
    let cells = wacc_range.par_iter().map(row).collect();
    #[cfg(not(feature = "parallel"))]
    let cells = wacc_range.iter().map(row).collect();

    Ok(cells)
}

/// Project, resolve the discount rate and build the grid around the base case.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> DcfResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (wacc, _) = resolve_discount_rate(&input.discount_rate, &mut warnings)?;
    let projections = project(&input.projection)?;
    let fcf = free_cash_flows(&projections);

    let ranges = match &input.ranges {
        Some(r) => r.clone(),
        None => SensitivityRanges::around(wacc, input.terminal_growth_rate, &input.config)?,
    };

    let cells = grid(
        &fcf,
        input.net_debt,
        input.shares_outstanding,
        &ranges.wacc,
        &ranges.terminal_growth,
    )?;

    let invalid = cells.iter().flatten().filter(|c| c.is_none()).count();
    if invalid > 0 {
        warnings.push(format!(
            "{invalid} of {} cells left empty where WACC does not exceed terminal growth",
            ranges.wacc.len() * ranges.terminal_growth.len()
        ));
    }
    debug!(
        rows = ranges.wacc.len(),
        cols = ranges.terminal_growth.len(),
        invalid,
        "sensitivity grid evaluated"
    );

    let base_row = closest_index(&ranges.wacc, wacc);
    let base_col = closest_index(&ranges.terminal_growth, input.terminal_growth_rate);
    let base_case_value = value(
        &fcf,
        wacc,
        input.terminal_growth_rate,
        input.net_debt,
        input.shares_outstanding,
    )
    .ok()
    .map(|v| v.value_per_share);

    let output = SensitivityGrid {
        wacc_values: ranges.wacc,
        terminal_growth_values: ranges.terminal_growth,
        cells,
        base_case_position: (base_row, base_col),
        base_case_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "WACC x terminal growth sensitivity of value per share",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Find the closest index to a target value.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::projection::{DepreciationMode, GrowthAssumptions, YearAssumption};

    fn fcf() -> Vec<Money> {
        vec![dec!(97.75), dec!(114.5), dec!(136.6), dec!(159.36), dec!(180.7)]
    }

    fn sample_input() -> SensitivityInput {
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
        SensitivityInput {
            projection: ProjectionStrategy::GrowthDriven(GrowthAssumptions {
                base_revenue: dec!(1000),
                years,
                depreciation: DepreciationMode::PctOfRevenue(dec!(0.06)),
                capex_pct_of_revenue: dec!(0.08),
                wc_change_pct_of_revenue_growth: dec!(0.03),
                tax_rate: dec!(0.25),
            }),
            discount_rate: DiscountRate::Wacc(dec!(0.10)),
            terminal_growth_rate: dec!(0.025),
            net_debt: dec!(10),
            shares_outstanding: dec!(10),
            config: SensitivityConfig::default(),
            ranges: None,
        }
    }

    #[test]
    fn test_linspace() {
        assert_eq!(
            linspace(dec!(0), dec!(1), 5),
            vec![dec!(0), dec!(0.25), dec!(0.5), dec!(0.75), dec!(1)]
        );
        assert_eq!(linspace(dec!(0.07), dec!(0.13), 11).len(), 11);
        assert_eq!(*linspace(dec!(0.07), dec!(0.13), 11).last().unwrap(), dec!(0.13));
        assert_eq!(linspace(dec!(3), dec!(4), 1), vec![dec!(3)]);
        assert!(linspace(dec!(3), dec!(4), 0).is_empty());
    }

    #[test]
    fn test_default_ranges() {
        let r = SensitivityRanges::around(dec!(0.10), dec!(0.025), &SensitivityConfig::default())
            .unwrap();
        assert_eq!(r.wacc.len(), 11);
        assert_eq!(r.wacc[0], dec!(0.07));
        assert_eq!(r.wacc[10], dec!(0.13));
        assert_eq!(r.terminal_growth[0], dec!(0.0125));
        assert_eq!(r.terminal_growth[10], dec!(0.05));
    }

    #[test]
    fn test_growth_axis_capped() {
        let r = SensitivityRanges::around(dec!(0.12), dec!(0.04), &SensitivityConfig::default())
            .unwrap();
        assert_eq!(*r.terminal_growth.last().unwrap(), dec!(0.05));
    }

    #[test]
    fn test_single_step_rejected() {
        let cfg = SensitivityConfig {
            steps: 1,
            ..SensitivityConfig::default()
        };
        assert!(SensitivityRanges::around(dec!(0.10), dec!(0.02), &cfg).is_err());
    }

    #[test]
    fn test_grid_monotonic() {
        let waccs = linspace(dec!(0.08), dec!(0.12), 5);
        let growths = linspace(dec!(0.01), dec!(0.04), 4);
        let cells = grid(&fcf(), dec!(10), dec!(10), &waccs, &growths).unwrap();

        assert_eq!(cells.len(), 5);
        assert!(cells.iter().all(|row| row.len() == 4));
        let v = |i: usize, j: usize| cells[i][j].unwrap();
        // down a column: higher WACC, lower value
        for i in 0..4 {
            assert!(v(i, 0) > v(i + 1, 0));
        }
        // along a row: higher growth, higher value
        for j in 0..3 {
            assert!(v(0, j) < v(0, j + 1));
        }
    }

    #[test]
    fn test_grid_invalid_cells_are_none() {
        let waccs = vec![dec!(0.03), dec!(0.05), dec!(0.10)];
        let growths = vec![dec!(0.02), dec!(0.05)];
        let cells = grid(&fcf(), dec!(0), dec!(10), &waccs, &growths).unwrap();

        assert!(cells[0][0].is_some());
        assert!(cells[0][1].is_none());
        assert!(cells[1][1].is_none());
        assert!(cells[2][1].is_some());
    }

    #[test]
    fn test_grid_static_errors() {
        let waccs = vec![dec!(0.10)];
        let growths = vec![dec!(0.02)];
        assert!(grid(&[], dec!(0), dec!(10), &waccs, &growths).is_err());
        assert!(grid(&fcf(), dec!(0), dec!(10), &[], &growths).is_err());
        assert!(matches!(
            grid(&fcf(), dec!(0), Decimal::ZERO, &waccs, &growths),
            Err(ValuationError::ZeroOrNegativeShareCount(_))
        ));
    }

    #[test]
    fn test_run_sensitivity_base_case() {
        let out = run_sensitivity(&sample_input()).unwrap();
        let g = &out.result;

        // WACC 0.10 is the middle of 0.07..0.13; g 0.025 is nearest 0.02375
        // on the 0.0125..0.05 axis.
        assert_eq!(g.base_case_position.0, 5);
        assert_eq!(g.base_case_position.1, 3);
        let base = g.base_case_value.unwrap();
        assert!((base - dec!(203.0548474393825)).abs() < dec!(0.0001));
        assert!(g.cells[5][3].is_some());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_run_sensitivity_counts_invalid_cells() {
        let mut input = sample_input();
        input.ranges = Some(SensitivityRanges {
            wacc: vec![dec!(0.02), dec!(0.10)],
            terminal_growth: vec![dec!(0.02), dec!(0.03)],
        });
        let out = run_sensitivity(&input).unwrap();
        assert_eq!(out.result.cells[0], vec![None, None]);
        assert!(out.warnings.iter().any(|w| w.starts_with("2 of 4 cells")));
    }
}
