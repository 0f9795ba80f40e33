//! Classical technical indicators over raw price series.
//!
//! Every function returns an output aligned 1:1 with its input, using `None`
//! as the warm-up marker. Insufficient history never raises — it yields a
//! fully undefined series, and any value derived from an undefined input is
//! itself undefined. Divide-by-zero cases carry explicit guards (flat
//! stochastic range reads as 50.0) instead of producing NaN.

use crate::application::statistics;

/// MACD line, signal line and histogram, all aligned to the input length.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Bollinger upper/middle/lower bands aligned to the input length.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Stochastic %K and %D series aligned to the input length.
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// Simple moving average. Entry `i` is the mean of the trailing `period`
/// values; the first `period − 1` entries are undefined.
pub fn sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || prices.len() < period {
        return vec![None; prices.len()];
    }

    let mut result: Vec<Option<f64>> = vec![None; period - 1];
    for i in (period - 1)..prices.len() {
        let window = &prices[i + 1 - period..=i];
        result.push(Some(window.iter().sum::<f64>() / period as f64));
    }
    result
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// values at index `period − 1`.
pub fn ema(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || prices.len() < period {
        return vec![None; prices.len()];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result: Vec<Option<f64>> = vec![None; period - 1];

    let seed = prices[..period].iter().sum::<f64>() / period as f64;
    result.push(Some(seed));

    let mut prev = seed;
    for &price in &prices[period..] {
        let current = (price - prev) * multiplier + prev;
        result.push(Some(current));
        prev = current;
    }
    result
}

/// Relative Strength Index in [0, 100]. The seed average gain/loss is a
/// simple mean of the first `period` deltas; later values use Wilder
/// smoothing. A zero average loss reads as RSI 100.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || prices.len() < period + 1 {
        return vec![None; prices.len()];
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = changes.iter().map(|&c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|&c| (-c).max(0.0)).collect();

    let mut result: Vec<Option<f64>> = vec![None; period];

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    result.push(Some(rsi_from_averages(avg_gain, avg_loss)));

    for i in period..changes.len() {
        avg_gain = (avg_gain * (period as f64 - 1.0) + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + losses[i]) / period as f64;
        result.push(Some(rsi_from_averages(avg_gain, avg_loss)));
    }
    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Moving Average Convergence Divergence.
///
/// The signal line is an EMA over the *defined* MACD values, left-padded back
/// to the full input length; the histogram is defined only where both lines
/// are. A series shorter than `slow` yields a fully undefined triplet.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let undefined = vec![None; prices.len()];
    if prices.len() < slow {
        return MacdSeries {
            macd: undefined.clone(),
            signal: undefined.clone(),
            histogram: undefined,
        };
    }

    let fast_ema = ema(prices, fast);
    let slow_ema = ema(prices, slow);

    let macd_line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let macd_values: Vec<f64> = macd_line.iter().filter_map(|v| *v).collect();
    if macd_values.len() < signal {
        return MacdSeries {
            macd: macd_line,
            signal: undefined.clone(),
            histogram: undefined,
        };
    }

    // EMA over the defined values only, then realign to the input length.
    let signal_ema = ema(&macd_values, signal);
    let mut signal_line: Vec<Option<f64>> = vec![None; prices.len() - signal_ema.len()];
    signal_line.extend(signal_ema);

    let histogram: Vec<Option<f64>> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

/// Bollinger Bands around an SMA middle band. The band offset uses the
/// population standard deviation (N denominator) of each window.
pub fn bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> BollingerSeries {
    if period == 0 || prices.len() < period {
        let undefined = vec![None; prices.len()];
        return BollingerSeries {
            upper: undefined.clone(),
            middle: undefined.clone(),
            lower: undefined,
        };
    }

    let middle = sma(prices, period);
    let mut upper: Vec<Option<f64>> = vec![None; period - 1];
    let mut lower: Vec<Option<f64>> = vec![None; period - 1];

    for i in (period - 1)..prices.len() {
        let window = &prices[i + 1 - period..=i];
        match (middle[i], statistics::population_std_dev(window)) {
            (Some(mid), Some(std)) => {
                upper.push(Some(mid + std_dev * std));
                lower.push(Some(mid - std_dev * std));
            }
            _ => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    BollingerSeries {
        upper,
        middle,
        lower,
    }
}

/// Average True Range with Wilder smoothing. The first bar's true range is
/// its high−low span; the seed ATR is a simple mean of the first `period`
/// true ranges.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let len = highs.len();
    if len != lows.len() || len != closes.len() {
        return vec![None; closes.len()];
    }
    if period == 0 || len < 2 || len < period {
        return vec![None; len];
    }

    let mut true_ranges: Vec<f64> = Vec::with_capacity(len);
    true_ranges.push(highs[0] - lows[0]);
    for i in 1..len {
        let high_low = highs[i] - lows[i];
        let high_close = (highs[i] - closes[i - 1]).abs();
        let low_close = (lows[i] - closes[i - 1]).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }

    let mut result: Vec<Option<f64>> = vec![None; period - 1];
    let seed = true_ranges[..period].iter().sum::<f64>() / period as f64;
    result.push(Some(seed));

    let mut prev = seed;
    for &tr in &true_ranges[period..] {
        let current = (prev * (period as f64 - 1.0) + tr) / period as f64;
        result.push(Some(current));
        prev = current;
    }
    result
}

/// Stochastic Oscillator. A flat window (`highest_high == lowest_low`) reads
/// as a neutral %K of exactly 50.0 rather than undefined; %D is an SMA over
/// the defined %K values, left-padded back to the input length.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticSeries {
    let len = closes.len();
    let undefined = vec![None; len];
    if highs.len() != len || lows.len() != len || k_period == 0 || len < k_period {
        return StochasticSeries {
            k: undefined.clone(),
            d: undefined,
        };
    }

    let mut k_values: Vec<Option<f64>> = vec![None; k_period - 1];
    for i in (k_period - 1)..len {
        let window_highs = &highs[i + 1 - k_period..=i];
        let window_lows = &lows[i + 1 - k_period..=i];

        let highest_high = window_highs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lowest_low = window_lows.iter().cloned().fold(f64::INFINITY, f64::min);

        if highest_high == lowest_low {
            k_values.push(Some(50.0));
        } else {
            let k = (closes[i] - lowest_low) / (highest_high - lowest_low) * 100.0;
            k_values.push(Some(k));
        }
    }

    let valid_k: Vec<f64> = k_values.iter().filter_map(|v| *v).collect();
    if valid_k.len() < d_period {
        return StochasticSeries {
            k: k_values,
            d: undefined,
        };
    }

    let d_sma = sma(&valid_k, d_period);
    let mut d_values: Vec<Option<f64>> = vec![None; len - d_sma.len()];
    d_values.extend(d_sma);

    StochasticSeries {
        k: k_values,
        d: d_values,
    }
}
