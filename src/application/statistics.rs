//! Length-guarded wrappers around the statrs summary statistics.
//!
//! statrs returns NaN for degenerate inputs (empty slices, single-sample
//! standard deviations); these helpers turn those cases into `None` so the
//! engines can degrade gracefully instead of propagating NaN.

use statrs::statistics::Statistics;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Statistics::mean(values))
}

/// Sample standard deviation (N−1 denominator). `None` below two samples.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(Statistics::std_dev(values))
}

/// Round to four decimal places, the precision reported values carry.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Population standard deviation (N denominator). `None` on empty input.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Statistics::population_std_dev(values))
}
