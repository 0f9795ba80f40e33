//! Interpretation of raw indicator values into directional signals.

use std::collections::BTreeMap;

use tracing::debug;

use crate::application::indicators;
use crate::config::AnalysisConfig;
use crate::domain::errors::InputError;
use crate::domain::types::{IndicatorResult, PriceBar, Signal};
use crate::domain::validation::validate_bars;

/// Stateless service that computes every configured indicator on a price
/// series and interprets the latest values. Construct one per caller or share
/// freely; it holds only configuration.
#[derive(Debug, Clone, Default)]
pub struct IndicatorAnalyzer {
    config: AnalysisConfig,
}

impl IndicatorAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Run all indicators on the series and interpret their latest values.
    ///
    /// Indicators still inside their warm-up window are omitted from the map.
    /// Map keys: `rsi`, `macd`, `bollinger`, `stochastic`, `atr`,
    /// `sma_<fast>`, `sma_<slow>`.
    pub fn analyze(
        &self,
        bars: &[PriceBar],
    ) -> Result<BTreeMap<String, IndicatorResult>, InputError> {
        validate_bars(bars)?;

        let mut results = BTreeMap::new();
        if bars.is_empty() {
            return Ok(results);
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let last_close = *closes.last().unwrap_or(&0.0);

        // RSI
        let rsi_series = indicators::rsi(&closes, self.config.rsi_period);
        if let Some(rsi_value) = last(&rsi_series) {
            let (signal, strength) = interpret_rsi(rsi_value);
            results.insert(
                "rsi".to_string(),
                result("RSI", rsi_value, signal, strength),
            );
        }

        // MACD
        let macd_series = indicators::macd(
            &closes,
            self.config.macd_fast_period,
            self.config.macd_slow_period,
            self.config.macd_signal_period,
        );
        if let Some(histogram) = last(&macd_series.histogram) {
            let (signal, strength) =
                interpret_macd(last(&macd_series.macd), last(&macd_series.signal), histogram);
            results.insert(
                "macd".to_string(),
                result("MACD", histogram, signal, strength),
            );
        }

        // Bollinger Bands; the reported value is the relative band width.
        let bands = indicators::bollinger_bands(
            &closes,
            self.config.bb_period,
            self.config.bb_std_dev,
        );
        if let (Some(upper), Some(middle), Some(lower)) =
            (last(&bands.upper), last(&bands.middle), last(&bands.lower))
        {
            let (signal, strength) = interpret_bollinger(last_close, upper, lower);
            let band_width = if middle != 0.0 {
                (upper - lower) / middle
            } else {
                0.0
            };
            results.insert(
                "bollinger".to_string(),
                result("Bollinger Bands", band_width, signal, strength),
            );
        }

        // Stochastic
        let stoch = indicators::stochastic(
            &highs,
            &lows,
            &closes,
            self.config.stoch_k_period,
            self.config.stoch_d_period,
        );
        if let (Some(k), Some(d)) = (last(&stoch.k), last(&stoch.d)) {
            let (signal, strength) = interpret_stochastic(k, d);
            results.insert(
                "stochastic".to_string(),
                result("Stochastic", k, signal, strength),
            );
        }

        // ATR is magnitude-only: always neutral, strength scales with the
        // range as a percentage of price (5% reads as full strength).
        let atr_series = indicators::atr(&highs, &lows, &closes, self.config.atr_period);
        if let Some(atr_value) = last(&atr_series) {
            let atr_pct = if last_close > 0.0 {
                atr_value / last_close * 100.0
            } else {
                0.0
            };
            results.insert(
                "atr".to_string(),
                result("ATR", atr_value, Signal::Neutral, (atr_pct / 5.0).min(1.0)),
            );
        }

        // Price vs moving averages
        for period in [self.config.fast_sma_period, self.config.slow_sma_period] {
            let series = indicators::sma(&closes, period);
            if let Some(sma_value) = last(&series) {
                let (signal, strength) = interpret_price_vs_sma(last_close, sma_value);
                results.insert(
                    format!("sma_{period}"),
                    result(&format!("SMA {period}"), sma_value, signal, strength),
                );
            }
        }

        debug!(
            bars = bars.len(),
            indicators = results.len(),
            "indicator analysis complete"
        );
        Ok(results)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}

fn last(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

fn result(name: &str, value: f64, signal: Signal, strength: f64) -> IndicatorResult {
    IndicatorResult {
        name: name.to_string(),
        value,
        signal,
        strength: strength.clamp(0.0, 1.0),
    }
}

/// RSI ≥ 70 is overbought (bearish), ≤ 30 oversold (bullish).
fn interpret_rsi(rsi: f64) -> (Signal, f64) {
    if rsi >= 70.0 {
        (Signal::Bearish, (rsi - 70.0) / 30.0)
    } else if rsi <= 30.0 {
        (Signal::Bullish, (30.0 - rsi) / 30.0)
    } else {
        (Signal::Neutral, 0.0)
    }
}

/// Histogram polarity gives the direction; strength is the histogram relative
/// to the MACD line, zero when the line itself is zero.
fn interpret_macd(macd: Option<f64>, signal: Option<f64>, histogram: f64) -> (Signal, f64) {
    let (Some(macd), Some(_signal)) = (macd, signal) else {
        return (Signal::Neutral, 0.0);
    };

    let strength = if macd != 0.0 {
        (histogram / macd).abs().min(1.0)
    } else {
        0.0
    };

    if histogram > 0.0 {
        (Signal::Bullish, strength)
    } else if histogram < 0.0 {
        (Signal::Bearish, strength)
    } else {
        (Signal::Neutral, 0.0)
    }
}

/// Position within the bands: near the upper band is overbought, near the
/// lower band oversold. A collapsed band reads as neutral.
fn interpret_bollinger(price: f64, upper: f64, lower: f64) -> (Signal, f64) {
    let band_width = upper - lower;
    if band_width == 0.0 {
        return (Signal::Neutral, 0.0);
    }

    let position = (price - lower) / band_width;
    if position >= 0.9 {
        (Signal::Bearish, (position - 0.5) * 2.0)
    } else if position <= 0.1 {
        (Signal::Bullish, (0.5 - position) * 2.0)
    } else {
        (Signal::Neutral, (0.5 - position).abs())
    }
}

/// Both lines ≥ 80 is overbought, both ≤ 20 oversold; otherwise the %K/%D
/// spread gives a weak directional lean.
fn interpret_stochastic(k: f64, d: f64) -> (Signal, f64) {
    if k >= 80.0 && d >= 80.0 {
        (Signal::Bearish, (k - 80.0) / 20.0)
    } else if k <= 20.0 && d <= 20.0 {
        (Signal::Bullish, (20.0 - k) / 20.0)
    } else if k > d {
        (Signal::Bullish, (k - d).abs() / 100.0)
    } else if k < d {
        (Signal::Bearish, (d - k).abs() / 100.0)
    } else {
        (Signal::Neutral, 0.0)
    }
}

fn interpret_price_vs_sma(price: f64, sma: f64) -> (Signal, f64) {
    let signal = if price > sma {
        Signal::Bullish
    } else {
        Signal::Bearish
    };
    let strength = if sma != 0.0 {
        ((price - sma).abs() / sma).min(1.0)
    } else {
        0.0
    };
    (signal, strength)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                    + chrono::Days::new(i as u64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }

    #[test]
    fn interpret_rsi_overbought() {
        assert_eq!(interpret_rsi(85.0), (Signal::Bearish, 0.5));
    }

    #[test]
    fn interpret_rsi_oversold() {
        assert_eq!(interpret_rsi(15.0), (Signal::Bullish, 0.5));
    }

    #[test]
    fn interpret_rsi_boundaries() {
        assert_eq!(interpret_rsi(70.0), (Signal::Bearish, 0.0));
        assert_eq!(interpret_rsi(30.0), (Signal::Bullish, 0.0));
        assert_eq!(interpret_rsi(50.0), (Signal::Neutral, 0.0));
    }

    #[test]
    fn interpret_macd_directions() {
        assert_eq!(interpret_macd(Some(2.0), Some(1.5), 0.5), (Signal::Bullish, 0.25));
        assert_eq!(interpret_macd(Some(-2.0), Some(-1.5), -0.5), (Signal::Bearish, 0.25));
        assert_eq!(interpret_macd(Some(2.0), Some(2.0), 0.0), (Signal::Neutral, 0.0));
    }

    #[test]
    fn interpret_macd_undefined_inputs_are_neutral() {
        assert_eq!(interpret_macd(None, Some(1.0), 0.5), (Signal::Neutral, 0.0));
        assert_eq!(interpret_macd(Some(1.0), None, 0.5), (Signal::Neutral, 0.0));
    }

    #[test]
    fn interpret_macd_zero_line_gives_zero_strength() {
        assert_eq!(interpret_macd(Some(0.0), Some(-0.5), 0.5), (Signal::Bullish, 0.0));
    }

    #[test]
    fn interpret_bollinger_positions() {
        // position = (price − lower) / width
        let (signal, strength) = interpret_bollinger(99.0, 100.0, 90.0);
        assert_eq!(signal, Signal::Bearish);
        assert!((strength - 0.8).abs() < 1e-12);

        let (signal, strength) = interpret_bollinger(90.5, 100.0, 90.0);
        assert_eq!(signal, Signal::Bullish);
        assert!((strength - 0.9).abs() < 1e-12);

        let (signal, strength) = interpret_bollinger(95.0, 100.0, 90.0);
        assert_eq!(signal, Signal::Neutral);
        assert!(strength.abs() < 1e-12);
    }

    #[test]
    fn interpret_bollinger_zero_width_is_neutral() {
        assert_eq!(interpret_bollinger(100.0, 100.0, 100.0), (Signal::Neutral, 0.0));
    }

    #[test]
    fn interpret_stochastic_extremes_and_cross() {
        assert_eq!(interpret_stochastic(90.0, 85.0), (Signal::Bearish, 0.5));
        assert_eq!(interpret_stochastic(10.0, 15.0), (Signal::Bullish, 0.5));
        assert_eq!(interpret_stochastic(60.0, 50.0), (Signal::Bullish, 0.1));
        assert_eq!(interpret_stochastic(50.0, 60.0), (Signal::Bearish, 0.1));
        assert_eq!(interpret_stochastic(50.0, 50.0), (Signal::Neutral, 0.0));
    }

    #[test]
    fn analyze_short_series_returns_empty_map() {
        let analyzer = IndicatorAnalyzer::new(AnalysisConfig::default());
        let results = analyzer.analyze(&bars_from_closes(&[100.0, 101.0])).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn analyze_long_series_produces_all_indicators() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.2).sin() * 4.0 + i as f64 * 0.05)
            .collect();
        let analyzer = IndicatorAnalyzer::new(AnalysisConfig::default());
        let results = analyzer.analyze(&bars_from_closes(&closes)).unwrap();
        for key in ["rsi", "macd", "bollinger", "stochastic", "atr", "sma_20", "sma_50"] {
            assert!(results.contains_key(key), "missing {key}");
        }
        for result in results.values() {
            assert!((0.0..=1.0).contains(&result.strength), "{} strength", result.name);
        }
    }

    #[test]
    fn analyze_rejects_malformed_input() {
        let mut bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        bars[1].close = f64::INFINITY;
        bars[1].high = f64::INFINITY;
        let analyzer = IndicatorAnalyzer::new(AnalysisConfig::default());
        assert!(analyzer.analyze(&bars).is_err());
    }

    #[test]
    fn flat_series_bollinger_is_neutral_with_zero_strength() {
        // 20 flat closes collapse the band to zero width.
        let analyzer = IndicatorAnalyzer::new(AnalysisConfig::default());
        let results = analyzer.analyze(&bars_from_closes(&[100.0; 20])).unwrap();
        let bollinger = &results["bollinger"];
        assert_eq!(bollinger.signal, Signal::Neutral);
        assert_eq!(bollinger.strength, 0.0);
        assert_eq!(bollinger.value, 0.0);
    }

    #[test]
    fn overbought_rsi_series_reads_bearish() {
        // Monotone rise with two small dips keeps losses non-zero but tiny.
        let mut closes = Vec::new();
        let mut price = 100.0;
        for i in 0..20 {
            price += if i == 7 || i == 13 { -0.2 } else { 1.0 };
            closes.push(price);
        }
        let analyzer = IndicatorAnalyzer::new(AnalysisConfig::default());
        let results = analyzer.analyze(&bars_from_closes(&closes)).unwrap();
        let rsi = &results["rsi"];
        assert!(rsi.value > 70.0, "expected overbought RSI, got {}", rsi.value);
        assert_eq!(rsi.signal, Signal::Bearish);
        assert!((rsi.strength - (rsi.value - 70.0) / 30.0).abs() < 1e-12);
    }
}
