use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single OHLCV bar. Series are expected in ascending chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Directional reading of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Bullish => write!(f, "bullish"),
            Signal::Bearish => write!(f, "bearish"),
            Signal::Neutral => write!(f, "neutral"),
        }
    }
}

/// Latest value of an indicator together with its interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: String,
    pub value: f64,
    pub signal: Signal,
    /// Interpretation confidence, clamped to [0, 1].
    pub strength: f64,
}

/// Per-indicator line item inside a [`SignalSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDetail {
    pub indicator: String,
    pub value: f64,
    pub signal: Signal,
    pub strength: f64,
}

/// Aggregated verdict across all interpreted indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub overall_signal: Signal,
    pub confidence: f64,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    pub details: Vec<SignalDetail>,
}

impl SignalSummary {
    /// Summary for a series with no interpretable indicators.
    pub fn empty() -> Self {
        Self {
            overall_signal: Signal::Neutral,
            confidence: 0.0,
            bullish_count: 0,
            bearish_count: 0,
            neutral_count: 0,
            details: Vec::new(),
        }
    }
}

/// Kind of moving-average crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverKind {
    GoldenCross,
    DeathCross,
}

impl fmt::Display for CrossoverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossoverKind::GoldenCross => write!(f, "golden_cross"),
            CrossoverKind::DeathCross => write!(f, "death_cross"),
        }
    }
}

/// A point where the 50-bar SMA crossed the 200-bar SMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverEvent {
    pub kind: CrossoverKind,
    /// Index of the bar where the crossover completed.
    pub index: usize,
    pub price: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub signal: Signal,
    pub description: String,
}

/// Category of detected market anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    VolumeSpike,
    PriceGap,
    VolatilitySurge,
    UnusualPriceMove,
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyType::VolumeSpike => write!(f, "volume_spike"),
            AnomalyType::PriceGap => write!(f, "price_gap"),
            AnomalyType::VolatilitySurge => write!(f, "volatility_surge"),
            AnomalyType::UnusualPriceMove => write!(f, "unusual_price_move"),
        }
    }
}

/// Severity of a detected anomaly, ordered `Info < Warning < Alert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Alert,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Alert => write!(f, "alert"),
        }
    }
}

/// A statistically unusual observation in a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedAnomaly {
    pub anomaly_type: AnomalyType,
    pub symbol: String,
    pub detected_at: DateTime<Utc>,
    pub severity: Severity,
    /// The anomalous observation itself.
    pub value: f64,
    /// The range considered normal for this metric (lo, hi).
    pub expected_range: (f64, f64),
    /// Standard deviations from the baseline mean. For price gaps this is a
    /// range-normalized magnitude ratio rather than a true z-score.
    pub z_score: f64,
    pub description: String,
}
