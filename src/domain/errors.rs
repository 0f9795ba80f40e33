use chrono::NaiveDate;
use thiserror::Error;

/// Malformed input detected at the analysis boundary.
///
/// The numeric engines themselves never raise on short history (they emit
/// undefined warm-up markers instead); only structurally invalid data is
/// rejected, before any computation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("non-finite {field} at bar {index}")]
    NonFinite { index: usize, field: &'static str },

    #[error("bar dates must be strictly ascending: bar {index} ({current}) does not follow {previous}")]
    NonAscendingDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("negative {field} at bar {index}: {value}")]
    NegativeValue {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("high {high} is below low {low} at bar {index}")]
    InvertedRange { index: usize, high: f64, low: f64 },
}
