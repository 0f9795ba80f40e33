//! Analysis parameter configuration.
//!
//! Defaults are the canonical indicator periods; `from_env` lets a deployment
//! override individual parameters through environment variables.

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::env;

/// Periods and thresholds for indicator computation and interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub atr_period: usize,
    pub stoch_k_period: usize,
    pub stoch_d_period: usize,
    pub fast_sma_period: usize,
    pub slow_sma_period: usize,
    /// Short leg of the crossover scan (golden/death cross).
    pub cross_fast_period: usize,
    /// Long leg of the crossover scan; also the minimum series length.
    pub cross_slow_period: usize,
    /// How many trailing bars the crossover scan inspects.
    pub cross_scan_bars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
            atr_period: 14,
            stoch_k_period: 14,
            stoch_d_period: 3,
            fast_sma_period: 20,
            slow_sma_period: 50,
            cross_fast_period: 50,
            cross_slow_period: 200,
            cross_scan_bars: 20,
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            rsi_period: parse_usize("RSI_PERIOD", defaults.rsi_period)?,
            macd_fast_period: parse_usize("MACD_FAST_PERIOD", defaults.macd_fast_period)?,
            macd_slow_period: parse_usize("MACD_SLOW_PERIOD", defaults.macd_slow_period)?,
            macd_signal_period: parse_usize("MACD_SIGNAL_PERIOD", defaults.macd_signal_period)?,
            bb_period: parse_usize("BB_PERIOD", defaults.bb_period)?,
            bb_std_dev: parse_f64("BB_STD_DEV", defaults.bb_std_dev)?,
            atr_period: parse_usize("ATR_PERIOD", defaults.atr_period)?,
            stoch_k_period: parse_usize("STOCH_K_PERIOD", defaults.stoch_k_period)?,
            stoch_d_period: parse_usize("STOCH_D_PERIOD", defaults.stoch_d_period)?,
            fast_sma_period: parse_usize("FAST_SMA_PERIOD", defaults.fast_sma_period)?,
            slow_sma_period: parse_usize("SLOW_SMA_PERIOD", defaults.slow_sma_period)?,
            cross_fast_period: parse_usize("CROSS_FAST_PERIOD", defaults.cross_fast_period)?,
            cross_slow_period: parse_usize("CROSS_SLOW_PERIOD", defaults.cross_slow_period)?,
            cross_scan_bars: parse_usize("CROSS_SCAN_BARS", defaults.cross_scan_bars)?,
        };
        ensure!(
            config.macd_fast_period < config.macd_slow_period,
            "MACD_FAST_PERIOD must be smaller than MACD_SLOW_PERIOD"
        );
        ensure!(
            config.cross_fast_period < config.cross_slow_period,
            "CROSS_FAST_PERIOD must be smaller than CROSS_SLOW_PERIOD"
        );
        Ok(config)
    }
}

/// Lookbacks and z-score thresholds for anomaly detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Baseline window for volume and volatility statistics.
    pub lookback: usize,
    /// Window for the "current" volatility estimate.
    pub current_vol_window: usize,
    /// Minimum historical changes for the unusual-move check.
    pub min_move_history: usize,
    pub info_threshold: f64,
    pub warning_threshold: f64,
    pub alert_threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            current_vol_window: 5,
            min_move_history: 10,
            info_threshold: 2.0,
            warning_threshold: 2.5,
            alert_threshold: 3.0,
        }
    }
}

impl AnomalyConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            lookback: parse_usize("ANOMALY_LOOKBACK", defaults.lookback)?,
            current_vol_window: parse_usize(
                "ANOMALY_CURRENT_VOL_WINDOW",
                defaults.current_vol_window,
            )?,
            min_move_history: parse_usize("ANOMALY_MIN_MOVE_HISTORY", defaults.min_move_history)?,
            info_threshold: parse_f64("ANOMALY_INFO_THRESHOLD", defaults.info_threshold)?,
            warning_threshold: parse_f64("ANOMALY_WARNING_THRESHOLD", defaults.warning_threshold)?,
            alert_threshold: parse_f64("ANOMALY_ALERT_THRESHOLD", defaults.alert_threshold)?,
        };
        ensure!(
            config.info_threshold <= config.warning_threshold
                && config.warning_threshold <= config.alert_threshold,
            "anomaly thresholds must satisfy info <= warning <= alert"
        );
        Ok(config)
    }
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

fn parse_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}
