use crate::domain::errors::InputError;
use crate::domain::types::PriceBar;

/// Validate a price series before analysis.
///
/// Rejects non-finite fields, negative prices or volume, inverted high/low
/// ranges and non-strictly-ascending dates. An empty series is valid: every
/// engine degrades to an empty result rather than erroring on missing data.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), InputError> {
    for (index, bar) in bars.iter().enumerate() {
        let fields = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
            ("volume", bar.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(InputError::NonFinite { index, field });
            }
            if value < 0.0 {
                return Err(InputError::NegativeValue {
                    index,
                    field,
                    value,
                });
            }
        }
        if bar.high < bar.low {
            return Err(InputError::InvertedRange {
                index,
                high: bar.high,
                low: bar.low,
            });
        }
        if index > 0 {
            let previous = bars[index - 1].date;
            if bar.date <= previous {
                return Err(InputError::NonAscendingDates {
                    index,
                    previous,
                    current: bar.date,
                });
            }
        }
    }
    Ok(())
}
