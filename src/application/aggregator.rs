//! Aggregation of per-indicator signals and moving-average crossover scans.

use std::collections::BTreeMap;

use tracing::debug;

use crate::application::indicators;
use crate::application::statistics::round4;
use crate::config::AnalysisConfig;
use crate::domain::types::{
    CrossoverEvent, CrossoverKind, IndicatorResult, Signal, SignalDetail, SignalSummary,
};

/// Combines interpreted indicators into an overall verdict and scans the
/// series tail for golden/death crosses. Stateless apart from configuration.
#[derive(Debug, Clone, Default)]
pub struct SignalAggregator {
    config: AnalysisConfig,
}

impl SignalAggregator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Majority vote across indicators. Confidence blends agreement (share of
    /// indicators voting with the majority direction) with average strength;
    /// only directional strengths enter the numerator while the denominator
    /// counts every indicator, neutral ones included.
    pub fn summarize(&self, results: &BTreeMap<String, IndicatorResult>) -> SignalSummary {
        if results.is_empty() {
            return SignalSummary::empty();
        }

        let mut bullish_count = 0usize;
        let mut bearish_count = 0usize;
        let mut neutral_count = 0usize;
        let mut total_strength = 0.0;
        let mut details = Vec::with_capacity(results.len());

        for result in results.values() {
            details.push(SignalDetail {
                indicator: result.name.clone(),
                value: round4(result.value),
                signal: result.signal,
                strength: round4(result.strength),
            });

            match result.signal {
                Signal::Bullish => {
                    bullish_count += 1;
                    total_strength += result.strength;
                }
                Signal::Bearish => {
                    bearish_count += 1;
                    total_strength += result.strength;
                }
                Signal::Neutral => neutral_count += 1,
            }
        }

        let overall_signal = if bullish_count > bearish_count {
            Signal::Bullish
        } else if bearish_count > bullish_count {
            Signal::Bearish
        } else {
            Signal::Neutral
        };

        let total = results.len() as f64;
        let signal_agreement = bullish_count.max(bearish_count) as f64 / total;
        let avg_strength = total_strength / total;
        let confidence = round4((signal_agreement + avg_strength) / 2.0);

        SignalSummary {
            overall_signal,
            confidence,
            bullish_count,
            bearish_count,
            neutral_count,
            details,
        }
    }

    /// Scan the trailing `cross_scan_bars` bars for points where the fast SMA
    /// crossed the slow SMA. Series shorter than the slow period yield no
    /// events. Every crossover in the scanned tail is reported.
    pub fn detect_crossovers(&self, prices: &[f64]) -> Vec<CrossoverEvent> {
        let fast_period = self.config.cross_fast_period;
        let slow_period = self.config.cross_slow_period;
        let mut crossovers = Vec::new();

        // A zero slow period would start the scan at index 0 and underflow
        // the previous-bar lookup below.
        if slow_period == 0 || prices.len() < slow_period {
            debug!(
                bars = prices.len(),
                required = slow_period,
                "series too short for crossover scan"
            );
            return crossovers;
        }

        let fast_sma = indicators::sma(prices, fast_period);
        let slow_sma = indicators::sma(prices, slow_period);

        let scan_start = slow_period.max(prices.len().saturating_sub(self.config.cross_scan_bars));
        for i in scan_start..prices.len() {
            let (Some(curr_fast), Some(curr_slow), Some(prev_fast), Some(prev_slow)) =
                (fast_sma[i], slow_sma[i], fast_sma[i - 1], slow_sma[i - 1])
            else {
                continue;
            };

            if prev_fast <= prev_slow && curr_fast > curr_slow {
                crossovers.push(CrossoverEvent {
                    kind: CrossoverKind::GoldenCross,
                    index: i,
                    price: prices[i],
                    sma_50: curr_fast,
                    sma_200: curr_slow,
                    signal: Signal::Bullish,
                    description: format!(
                        "{fast_period}-day SMA crossed above {slow_period}-day SMA"
                    ),
                });
            } else if prev_fast >= prev_slow && curr_fast < curr_slow {
                crossovers.push(CrossoverEvent {
                    kind: CrossoverKind::DeathCross,
                    index: i,
                    price: prices[i],
                    sma_50: curr_fast,
                    sma_200: curr_slow,
                    signal: Signal::Bearish,
                    description: format!(
                        "{fast_period}-day SMA crossed below {slow_period}-day SMA"
                    ),
                });
            }
        }

        crossovers
    }
}
