//! Composite technical scoring.
//!
//! Collapses the latest value of every computed indicator into a single
//! score in [−1, 1] with a TradingView-style rating. Each indicator casts a
//! buy/neutral/sell vote inside its category; category means are blended with
//! fixed weights, renormalized when a whole category has no usable data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::indicators;
use crate::application::statistics::round4;
use crate::config::AnalysisConfig;
use crate::domain::errors::InputError;
use crate::domain::types::PriceBar;
use crate::domain::validation::validate_bars;

/// Category weights. Pattern recognition is not implemented; its original
/// 0.15 share is redistributed proportionally across the four active
/// categories.
const CATEGORY_WEIGHTS: [(&str, f64); 4] = [
    ("trend", 0.353),
    ("momentum", 0.294),
    ("volatility", 0.176),
    ("volume", 0.176),
];

const RATING_THRESHOLDS: [(f64, Rating); 4] = [
    (0.5, Rating::StrongBuy),
    (0.1, Rating::Buy),
    (-0.1, Rating::Neutral),
    (-0.5, Rating::Sell),
];

/// Five-step rating derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::StrongBuy => write!(f, "Strong Buy"),
            Rating::Buy => write!(f, "Buy"),
            Rating::Neutral => write!(f, "Neutral"),
            Rating::Sell => write!(f, "Sell"),
            Rating::StrongSell => write!(f, "Strong Sell"),
        }
    }
}

/// Latest-value frame of every indicator the scorer can vote on.
/// Fields are `None` while the underlying indicator is still warming up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSnapshot {
    pub close: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    /// Position of the close within the bands, `(close − lower) / width`.
    pub bb_percent_b: Option<f64>,
    pub atr: Option<f64>,
    pub atr_prev: Option<f64>,
    /// Current volume over its 20-bar SMA.
    pub volume_ratio: Option<f64>,
}

impl FeatureSnapshot {
    /// Extract the latest indicator values from a price series.
    /// Returns `None` for an empty series.
    pub fn from_bars(bars: &[PriceBar], config: &AnalysisConfig) -> Option<Self> {
        let last_bar = bars.last()?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let macd = indicators::macd(
            &closes,
            config.macd_fast_period,
            config.macd_slow_period,
            config.macd_signal_period,
        );
        let bands = indicators::bollinger_bands(&closes, config.bb_period, config.bb_std_dev);
        let stoch = indicators::stochastic(
            &highs,
            &lows,
            &closes,
            config.stoch_k_period,
            config.stoch_d_period,
        );
        let atr_series = indicators::atr(&highs, &lows, &closes, config.atr_period);

        let bb_upper = last(&bands.upper);
        let bb_lower = last(&bands.lower);
        let bb_percent_b = match (bb_upper, bb_lower) {
            (Some(upper), Some(lower)) if upper > lower => {
                Some((last_bar.close - lower) / (upper - lower))
            }
            _ => None,
        };

        let volume_ratio = last(&indicators::sma(&volumes, config.fast_sma_period))
            .filter(|&avg| avg > 0.0)
            .map(|avg| last_bar.volume / avg);

        Some(Self {
            close: last_bar.close,
            sma_20: last(&indicators::sma(&closes, config.fast_sma_period)),
            sma_50: last(&indicators::sma(&closes, config.slow_sma_period)),
            sma_200: last(&indicators::sma(&closes, config.cross_slow_period)),
            ema_12: last(&indicators::ema(&closes, config.macd_fast_period)),
            ema_26: last(&indicators::ema(&closes, config.macd_slow_period)),
            macd_line: last(&macd.macd),
            macd_signal: last(&macd.signal),
            macd_histogram: last(&macd.histogram),
            rsi: last(&indicators::rsi(&closes, config.rsi_period)),
            stoch_k: last(&stoch.k),
            stoch_d: last(&stoch.d),
            bb_upper,
            bb_lower,
            bb_percent_b,
            atr: last(&atr_series),
            atr_prev: previous(&atr_series),
            volume_ratio,
        })
    }
}

/// One indicator's vote inside the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorVote {
    /// −1 sell, 0 neutral, +1 buy.
    pub vote: i8,
    pub category: String,
}

/// Support/resistance/pivot levels extracted from the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
    pub pivot: Option<f64>,
}

/// Result of composite technical scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalScore {
    pub symbol: String,
    /// Weighted composite in [−1, 1].
    pub composite_score: f64,
    pub rating: Rating,
    /// Share of votes agreeing with the composite direction.
    pub confidence: f64,
    /// Mean vote per category.
    pub breakdown: BTreeMap<String, f64>,
    pub votes: BTreeMap<String, IndicatorVote>,
    pub key_levels: KeyLevels,
}

impl TechnicalScore {
    fn neutral(symbol: &str, key_levels: KeyLevels) -> Self {
        Self {
            symbol: symbol.to_string(),
            composite_score: 0.0,
            rating: Rating::Neutral,
            confidence: 0.0,
            breakdown: BTreeMap::new(),
            votes: BTreeMap::new(),
            key_levels,
        }
    }
}

/// Computes a weighted composite technical score from a feature snapshot.
#[derive(Debug, Clone, Default)]
pub struct TechnicalScorer {
    config: AnalysisConfig,
}

impl TechnicalScorer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Validate, snapshot, score.
    pub fn score_series(&self, symbol: &str, bars: &[PriceBar]) -> Result<TechnicalScore, InputError> {
        validate_bars(bars)?;
        match FeatureSnapshot::from_bars(bars, &self.config) {
            Some(snapshot) => Ok(self.score_snapshot(symbol, &snapshot)),
            None => Ok(TechnicalScore::neutral(symbol, KeyLevels::default())),
        }
    }

    /// Pure scoring core over an already extracted snapshot.
    pub fn score_snapshot(&self, symbol: &str, snapshot: &FeatureSnapshot) -> TechnicalScore {
        let trend = trend_votes(snapshot);
        let momentum = momentum_votes(snapshot);
        let volatility = volatility_votes(snapshot);

        let trend_mean = vote_mean(&trend).unwrap_or(0.0);
        let volume = volume_votes(snapshot, trend_mean);

        let categories: [(&str, &Vec<(String, i8)>); 4] = [
            ("trend", &trend),
            ("momentum", &momentum),
            ("volatility", &volatility),
            ("volume", &volume),
        ];

        let mut breakdown = BTreeMap::new();
        let mut active_weights: Vec<(&str, f64)> = Vec::new();
        for (name, votes) in &categories {
            match vote_mean(votes) {
                Some(mean) => {
                    breakdown.insert(name.to_string(), round4(mean));
                    let weight = CATEGORY_WEIGHTS
                        .iter()
                        .find(|(cat, _)| cat == name)
                        .map(|(_, w)| *w)
                        .unwrap_or(0.0);
                    active_weights.push((*name, weight));
                }
                None => debug!(symbol, category = name, "no usable indicators in category"),
            }
        }

        let key_levels = extract_key_levels(snapshot);
        if active_weights.is_empty() {
            debug!(symbol, "no indicators available, returning neutral score");
            return TechnicalScore::neutral(symbol, key_levels);
        }

        // Renormalize so missing categories redistribute their weight.
        let weight_sum: f64 = active_weights.iter().map(|(_, w)| w).sum();
        let composite: f64 = active_weights
            .iter()
            .map(|(name, weight)| weight / weight_sum * breakdown[*name])
            .sum::<f64>()
            .clamp(-1.0, 1.0);

        let rating = RATING_THRESHOLDS
            .iter()
            .find(|(threshold, _)| composite > *threshold)
            .map(|(_, rating)| *rating)
            .unwrap_or(Rating::StrongSell);

        let mut votes = BTreeMap::new();
        for (category, entries) in &categories {
            for (name, vote) in entries.iter() {
                votes.insert(
                    name.clone(),
                    IndicatorVote {
                        vote: *vote,
                        category: category.to_string(),
                    },
                );
            }
        }

        let confidence = if votes.is_empty() {
            0.0
        } else if composite != 0.0 {
            let direction = composite.signum() as i8;
            let agreeing = votes.values().filter(|v| v.vote.signum() == direction).count();
            agreeing as f64 / votes.len() as f64
        } else {
            let neutral = votes.values().filter(|v| v.vote == 0).count();
            neutral as f64 / votes.len() as f64
        };

        TechnicalScore {
            symbol: symbol.to_string(),
            composite_score: round4(composite),
            rating,
            confidence: round4(confidence),
            breakdown,
            votes,
            key_levels,
        }
    }
}

fn trend_votes(s: &FeatureSnapshot) -> Vec<(String, i8)> {
    let mut votes = Vec::new();
    for (name, value) in [
        ("sma_20", s.sma_20),
        ("sma_50", s.sma_50),
        ("sma_200", s.sma_200),
        ("ema_12", s.ema_12),
        ("ema_26", s.ema_26),
    ] {
        if let Some(level) = value {
            votes.push((name.to_string(), above_below(s.close, level)));
        }
    }
    if let Some(histogram) = s.macd_histogram {
        votes.push(("macd_histogram".to_string(), sign(histogram)));
    }
    if let (Some(line), Some(signal)) = (s.macd_line, s.macd_signal) {
        votes.push(("macd_crossover".to_string(), above_below(line, signal)));
    }
    votes
}

fn momentum_votes(s: &FeatureSnapshot) -> Vec<(String, i8)> {
    let mut votes = Vec::new();
    if let Some(rsi) = s.rsi {
        let vote = if rsi > 70.0 {
            -1
        } else if rsi < 30.0 {
            1
        } else {
            0
        };
        votes.push(("rsi".to_string(), vote));
    }
    if let Some(k) = s.stoch_k {
        let vote = if k > 80.0 {
            -1
        } else if k < 20.0 {
            1
        } else {
            match s.stoch_d {
                Some(d) => above_below(k, d),
                None => 0,
            }
        };
        votes.push(("stochastic".to_string(), vote));
    }
    votes
}

fn volatility_votes(s: &FeatureSnapshot) -> Vec<(String, i8)> {
    let mut votes = Vec::new();
    if let Some(pct_b) = s.bb_percent_b {
        let vote = if pct_b > 1.0 {
            -1
        } else if pct_b < 0.0 {
            1
        } else if (0.4..=0.6).contains(&pct_b) {
            0
        } else if pct_b > 0.5 {
            1
        } else {
            -1
        };
        votes.push(("bollinger_pct_b".to_string(), vote));
    }
    // Rising ATR amplifies whichever side of the trend price is on.
    if let (Some(atr), Some(atr_prev)) = (s.atr, s.atr_prev) {
        let vote = if atr > atr_prev {
            match s.sma_50 {
                Some(sma_50) => above_below(s.close, sma_50),
                None => 0,
            }
        } else {
            0
        };
        votes.push(("atr".to_string(), vote));
    }
    votes
}

fn volume_votes(s: &FeatureSnapshot, trend_mean: f64) -> Vec<(String, i8)> {
    let mut votes = Vec::new();
    if let Some(ratio) = s.volume_ratio {
        let vote = if ratio > 1.5 { sign(trend_mean) } else { 0 };
        votes.push(("volume_ratio".to_string(), vote));
    }
    votes
}

fn extract_key_levels(s: &FeatureSnapshot) -> KeyLevels {
    let mut support: Vec<f64> = [s.sma_200, s.bb_lower].iter().flatten().map(|v| round2(*v)).collect();
    let mut resistance: Vec<f64> = [s.bb_upper].iter().flatten().map(|v| round2(*v)).collect();
    support.sort_by(|a, b| a.total_cmp(b));
    resistance.sort_by(|a, b| a.total_cmp(b));
    KeyLevels {
        support,
        resistance,
        pivot: s.sma_50.map(round2),
    }
}

fn vote_mean(votes: &[(String, i8)]) -> Option<f64> {
    if votes.is_empty() {
        return None;
    }
    Some(votes.iter().map(|(_, v)| *v as f64).sum::<f64>() / votes.len() as f64)
}

fn above_below(value: f64, level: f64) -> i8 {
    if value > level { 1 } else { -1 }
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

fn last(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

fn previous(series: &[Option<f64>]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    series[series.len() - 2]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullish_snapshot() -> FeatureSnapshot {
        FeatureSnapshot {
            close: 110.0,
            sma_20: Some(105.0),
            sma_50: Some(102.0),
            sma_200: Some(95.0),
            ema_12: Some(106.0),
            ema_26: Some(103.0),
            macd_line: Some(1.2),
            macd_signal: Some(0.8),
            macd_histogram: Some(0.4),
            rsi: Some(62.0),
            stoch_k: Some(70.0),
            stoch_d: Some(60.0),
            bb_upper: Some(112.0),
            bb_lower: Some(98.0),
            bb_percent_b: Some(0.857),
            atr: Some(2.5),
            atr_prev: Some(2.0),
            volume_ratio: Some(2.0),
        }
    }

    #[test]
    fn uniformly_bullish_snapshot_scores_strong_buy() {
        let scorer = TechnicalScorer::default();
        let score = scorer.score_snapshot("TEST", &bullish_snapshot());
        // Every vote is +1 except neutral RSI, so the composite sits near 1.
        assert!(score.composite_score > 0.5, "score: {}", score.composite_score);
        assert_eq!(score.rating, Rating::StrongBuy);
        assert!(score.confidence > 0.8);
        assert_eq!(score.breakdown["volume"], 1.0);
    }

    #[test]
    fn mirrored_bearish_snapshot_scores_sell() {
        let snapshot = FeatureSnapshot {
            close: 90.0,
            sma_20: Some(95.0),
            sma_50: Some(98.0),
            sma_200: Some(105.0),
            ema_12: Some(94.0),
            ema_26: Some(97.0),
            macd_line: Some(-1.2),
            macd_signal: Some(-0.8),
            macd_histogram: Some(-0.4),
            rsi: Some(38.0),
            stoch_k: Some(30.0),
            stoch_d: Some(40.0),
            bb_upper: Some(102.0),
            bb_lower: Some(88.0),
            bb_percent_b: Some(0.143),
            atr: Some(2.5),
            atr_prev: Some(2.0),
            volume_ratio: Some(2.0),
        };
        let scorer = TechnicalScorer::default();
        let score = scorer.score_snapshot("TEST", &snapshot);
        assert!(score.composite_score < -0.5);
        assert_eq!(score.rating, Rating::StrongSell);
    }

    #[test]
    fn empty_snapshot_is_neutral() {
        let scorer = TechnicalScorer::default();
        let score = scorer.score_snapshot("TEST", &FeatureSnapshot::default());
        assert_eq!(score.rating, Rating::Neutral);
        assert_eq!(score.composite_score, 0.0);
        assert_eq!(score.confidence, 0.0);
        assert!(score.votes.is_empty());
    }

    #[test]
    fn missing_categories_redistribute_weight() {
        // Only trend data available: composite equals the trend mean.
        let snapshot = FeatureSnapshot {
            close: 110.0,
            sma_20: Some(105.0),
            sma_50: Some(102.0),
            ..Default::default()
        };
        let scorer = TechnicalScorer::default();
        let score = scorer.score_snapshot("TEST", &snapshot);
        assert_eq!(score.composite_score, 1.0);
        assert_eq!(score.breakdown.len(), 1);
        assert_eq!(score.rating, Rating::StrongBuy);
    }

    #[test]
    fn overbought_rsi_votes_sell() {
        let snapshot = FeatureSnapshot {
            close: 100.0,
            rsi: Some(75.0),
            ..Default::default()
        };
        let scorer = TechnicalScorer::default();
        let score = scorer.score_snapshot("TEST", &snapshot);
        assert_eq!(score.votes["rsi"].vote, -1);
        assert_eq!(score.votes["rsi"].category, "momentum");
    }

    #[test]
    fn falling_atr_is_a_neutral_vote() {
        let snapshot = FeatureSnapshot {
            close: 110.0,
            sma_50: Some(100.0),
            atr: Some(1.5),
            atr_prev: Some(2.0),
            ..Default::default()
        };
        let scorer = TechnicalScorer::default();
        let score = scorer.score_snapshot("TEST", &snapshot);
        assert_eq!(score.votes["atr"].vote, 0);
    }

    #[test]
    fn quiet_volume_does_not_amplify_trend() {
        let snapshot = FeatureSnapshot {
            close: 110.0,
            sma_20: Some(100.0),
            volume_ratio: Some(0.9),
            ..Default::default()
        };
        let scorer = TechnicalScorer::default();
        let score = scorer.score_snapshot("TEST", &snapshot);
        assert_eq!(score.votes["volume_ratio"].vote, 0);
    }

    #[test]
    fn key_levels_come_from_bands_and_long_smas() {
        let score = TechnicalScorer::default().score_snapshot("TEST", &bullish_snapshot());
        assert_eq!(score.key_levels.support, vec![95.0, 98.0]);
        assert_eq!(score.key_levels.resistance, vec![112.0]);
        assert_eq!(score.key_levels.pivot, Some(102.0));
    }

    #[test]
    fn snapshot_from_bars_fills_expected_fields() {
        use chrono::NaiveDate;
        let bars: Vec<PriceBar> = (0..250)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.3;
                PriceBar {
                    date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                        + chrono::Days::new(i as u64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000.0,
                }
            })
            .collect();
        let snapshot = FeatureSnapshot::from_bars(&bars, &AnalysisConfig::default()).unwrap();
        assert!(snapshot.sma_200.is_some());
        assert!(snapshot.macd_histogram.is_some());
        assert!(snapshot.atr_prev.is_some());
        // Constant volume sits exactly on its own SMA.
        assert!((snapshot.volume_ratio.unwrap() - 1.0).abs() < 1e-9);
        // Steady uptrend: price above every moving average.
        assert!(snapshot.close > snapshot.sma_20.unwrap());
    }

    #[test]
    fn score_series_on_uptrend_leans_long() {
        use chrono::NaiveDate;
        let bars: Vec<PriceBar> = (0..250)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.3 + (i as f64 * 0.5).sin();
                PriceBar {
                    date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                        + chrono::Days::new(i as u64),
                    open: close,
                    high: close + 1.5,
                    low: close - 1.5,
                    close,
                    volume: 1_000_000.0,
                }
            })
            .collect();
        let score = TechnicalScorer::default().score_series("UPTREND", &bars).unwrap();
        assert!((-1.0..=1.0).contains(&score.composite_score));
        // The moving-average votes dominate the trend category regardless of
        // where the oscillators land.
        assert!(score.breakdown["trend"] > 0.0);
        assert!(!score.votes.is_empty());
    }
}
