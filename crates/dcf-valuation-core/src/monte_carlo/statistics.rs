use serde::{Deserialize, Serialize};

/// Number of equal-width bins in the value histogram.
pub const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// A single histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Descriptive statistics of a set of simulated per-share values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// `std_dev / |mean|`, or 0 when the mean is 0
    pub coefficient_of_variation: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Percentiles,
    /// Share of values strictly above zero
    pub probability_positive: f64,
    /// 2.5th and 97.5th percentiles
    pub confidence_interval_95: (f64, f64),
    pub histogram: Vec<HistogramBin>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Percentile of a **sorted** slice with linear interpolation between
/// closest ranks. `p` is in 0..=100. Returns NaN on an empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Population mean and standard deviation. `(NaN, NaN)` when empty.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Drop values further than `k_sigma` population standard deviations from
/// the mean. Order of the survivors is preserved.
///
/// Returns the retained values and the number removed.
pub fn filter_outliers(values: &[f64], k_sigma: f64) -> (Vec<f64>, usize) {
    let (mean, std_dev) = mean_std(values);
    if values.len() < 2 || std_dev == 0.0 || !std_dev.is_finite() {
        return (values.to_vec(), 0);
    }
    let limit = k_sigma * std_dev;
    let kept: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| (v - mean).abs() <= limit)
        .collect();
    let removed = values.len() - kept.len();
    (kept, removed)
}

/// Build a histogram with `num_bins` equal-width bins over a sorted slice.
pub fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    if sorted.is_empty() || num_bins == 0 {
        return Vec::new();
    }
    let min_val = sorted[0];
    let max_val = sorted[sorted.len() - 1];

    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| HistogramBin {
            lower: min_val + i as f64 * bin_width,
            upper: if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            },
            count: 0,
            frequency: 0.0,
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }
    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }
    bins
}

/// Summarise a set of values. `None` when the set is empty.
pub fn summarize(values: &[f64]) -> Option<DistributionSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let (mean, std_dev) = mean_std(&sorted);
    let coefficient_of_variation = if mean == 0.0 { 0.0 } else { std_dev / mean.abs() };
    let positive = sorted.iter().filter(|v| **v > 0.0).count();

    Some(DistributionSummary {
        count: sorted.len(),
        mean,
        median: percentile_sorted(&sorted, 50.0),
        std_dev,
        coefficient_of_variation,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        percentiles: Percentiles {
            p10: percentile_sorted(&sorted, 10.0),
            p25: percentile_sorted(&sorted, 25.0),
            p50: percentile_sorted(&sorted, 50.0),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
        },
        probability_positive: positive as f64 / sorted.len() as f64,
        confidence_interval_95: (
            percentile_sorted(&sorted, 2.5),
            percentile_sorted(&sorted, 97.5),
        ),
        histogram: build_histogram(&sorted, HISTOGRAM_BINS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_linear_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        // rank 0.25 * 3 = 0.75 -> 1 + 0.75
        assert!((percentile_sorted(&v, 25.0) - 1.75).abs() < 1e-12);
        assert_eq!(percentile_sorted(&v, 50.0), 2.5);
        assert_eq!(percentile_sorted(&v, 0.0), 1.0);
        assert_eq!(percentile_sorted(&v, 100.0), 4.0);
        assert_eq!(percentile_sorted(&[9.0], 90.0), 9.0);
        assert!(percentile_sorted(&[], 50.0).is_nan());
    }

    #[test]
    fn test_mean_std_population() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(m, 5.0);
        assert_eq!(s, 2.0);
    }

    #[test]
    fn test_filter_outliers_drops_injected_value() {
        let mut values: Vec<f64> = (0..200).map(|i| 100.0 + (i % 10) as f64).collect();
        values.push(1_000_000.0);

        let (kept, removed) = filter_outliers(&values, 3.0);
        assert_eq!(removed, 1);
        assert!(!kept.contains(&1_000_000.0));
        assert_eq!(kept.len(), 200);
    }

    #[test]
    fn test_filter_outliers_constant_set() {
        let (kept, removed) = filter_outliers(&[5.0; 10], 3.0);
        assert_eq!(removed, 0);
        assert_eq!(kept.len(), 10);
    }

    #[test]
    fn test_histogram_counts() {
        let sorted: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let bins = build_histogram(&sorted, HISTOGRAM_BINS);
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u32>(), 100);
        let total_freq: f64 = bins.iter().map(|b| b.frequency).sum();
        assert!((total_freq - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_fields() {
        let s = summarize(&[-1.0, 1.0, 2.0, 3.0, 5.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.median, 2.0);
        assert_eq!(s.min, -1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.probability_positive, 0.8);
        assert!(s.percentiles.p10 <= s.percentiles.p25);
        assert!(s.percentiles.p75 <= s.percentiles.p90);
        assert!(s.confidence_interval_95.0 < s.confidence_interval_95.1);
    }

    #[test]
    fn test_cv_zero_mean() {
        let s = summarize(&[-1.0, 1.0]).unwrap();
        assert_eq!(s.coefficient_of_variation, 0.0);
    }

    #[test]
    fn test_empty_summary() {
        assert!(summarize(&[]).is_none());
    }
}
