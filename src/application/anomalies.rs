//! Statistical anomaly detection over recent market activity.
//!
//! Four independent checks (volume, gap, volatility, price move) score the
//! most recent bar against its own history. Each check is one-shot and
//! stateless; a metric below the info threshold simply produces nothing.

use chrono::Utc;
use tracing::debug;

use crate::application::statistics;
use crate::config::AnomalyConfig;
use crate::domain::errors::InputError;
use crate::domain::types::{AnomalyType, DetectedAnomaly, PriceBar, Severity};
use crate::domain::validation::validate_bars;

/// Minimum rolling-volatility samples required before the surge check runs.
const MIN_VOL_SAMPLES: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Map an absolute score to a severity, or `None` below the info level.
    fn severity_for(&self, score: f64) -> Option<Severity> {
        if score >= self.config.alert_threshold {
            Some(Severity::Alert)
        } else if score >= self.config.warning_threshold {
            Some(Severity::Warning)
        } else if score >= self.config.info_threshold {
            Some(Severity::Info)
        } else {
            None
        }
    }

    /// Unusual trading volume versus the trailing baseline window.
    ///
    /// A zero-variance baseline suppresses detection entirely, even for
    /// visually extreme current volumes; this mirrors the historical
    /// behaviour consumers already depend on.
    pub fn detect_volume_spike(
        &self,
        symbol: &str,
        volumes: &[f64],
        current_volume: f64,
    ) -> Option<DetectedAnomaly> {
        let lookback = self.config.lookback;
        if volumes.len() < lookback {
            return None;
        }

        let recent = &volumes[volumes.len() - lookback..];
        let mean = statistics::mean(recent)?;
        let std = statistics::sample_std_dev(recent).unwrap_or(0.0);

        if std == 0.0 {
            debug!(symbol, "volume baseline has zero variance, skipping spike check");
            return None;
        }

        let z_score = (current_volume - mean) / std;
        let severity = self.severity_for(z_score.abs())?;
        let direction = if z_score > 0.0 { "above" } else { "below" };

        Some(DetectedAnomaly {
            anomaly_type: AnomalyType::VolumeSpike,
            symbol: symbol.to_string(),
            detected_at: Utc::now(),
            severity,
            value: current_volume,
            expected_range: (mean - 2.0 * std, mean + 2.0 * std),
            z_score,
            description: format!(
                "Volume {:.1} std devs {} normal ({:.0} vs avg {:.0})",
                z_score.abs(),
                direction,
                current_volume,
                mean
            ),
        })
    }

    /// Gap between the previous close and the current open, measured against
    /// the average daily range. The reported score is a range-normalized
    /// magnitude ratio, not a population z-score — no gap history enters it.
    pub fn detect_price_gap(
        &self,
        symbol: &str,
        prev_close: f64,
        current_open: f64,
        avg_daily_range_pct: f64,
    ) -> Option<DetectedAnomaly> {
        if prev_close <= 0.0 || avg_daily_range_pct <= 0.0 {
            return None;
        }

        let gap_pct = (current_open - prev_close) / prev_close * 100.0;
        let range_ratio = gap_pct.abs() / avg_daily_range_pct;
        let severity = self.severity_for(range_ratio)?;
        let direction = if gap_pct > 0.0 { "up" } else { "down" };

        Some(DetectedAnomaly {
            anomaly_type: AnomalyType::PriceGap,
            symbol: symbol.to_string(),
            detected_at: Utc::now(),
            severity,
            value: gap_pct,
            expected_range: (-avg_daily_range_pct, avg_daily_range_pct),
            z_score: range_ratio,
            description: format!(
                "Gap {} {:.2}% (avg daily range: {:.2}%)",
                direction,
                gap_pct.abs(),
                avg_daily_range_pct
            ),
        })
    }

    /// Sudden rise of short-window return volatility above its own rolling
    /// history. One-sided: a volatility collapse is not an anomaly.
    pub fn detect_volatility_surge(&self, symbol: &str, closes: &[f64]) -> Option<DetectedAnomaly> {
        let lookback = self.config.lookback;
        let window = self.config.current_vol_window;
        if closes.len() < lookback + window {
            return None;
        }

        let mut returns = Vec::with_capacity(closes.len() - 1);
        for pair in closes.windows(2) {
            if pair[0] > 0.0 {
                returns.push((pair[1] - pair[0]) / pair[0]);
            }
        }
        if returns.len() < lookback + window {
            return None;
        }

        let mut historical_vols = Vec::new();
        for i in lookback..returns.len() {
            if let Some(vol) = statistics::sample_std_dev(&returns[i - lookback..i]) {
                historical_vols.push(vol);
            }
        }
        if historical_vols.len() < MIN_VOL_SAMPLES {
            return None;
        }

        let current_vol = statistics::sample_std_dev(&returns[returns.len() - window..])?;
        let mean_vol = statistics::mean(&historical_vols)?;
        let std_vol = statistics::sample_std_dev(&historical_vols).unwrap_or(0.0);

        if std_vol == 0.0 {
            debug!(symbol, "historical volatility has zero variance, skipping surge check");
            return None;
        }

        let z_score = (current_vol - mean_vol) / std_vol;
        let severity = self.severity_for(z_score)?;

        Some(DetectedAnomaly {
            anomaly_type: AnomalyType::VolatilitySurge,
            symbol: symbol.to_string(),
            detected_at: Utc::now(),
            severity,
            value: current_vol * 100.0,
            expected_range: (
                ((mean_vol - 2.0 * std_vol) * 100.0).max(0.0),
                (mean_vol + 2.0 * std_vol) * 100.0,
            ),
            z_score,
            description: format!(
                "Volatility at {:.2}% vs historical avg {:.2}%",
                current_vol * 100.0,
                mean_vol * 100.0
            ),
        })
    }

    /// Daily price change far outside its historical distribution. Two-sided.
    pub fn detect_unusual_move(
        &self,
        symbol: &str,
        change_pct: f64,
        historical_changes: &[f64],
    ) -> Option<DetectedAnomaly> {
        if historical_changes.len() < self.config.min_move_history {
            return None;
        }

        let mean = statistics::mean(historical_changes)?;
        let std = statistics::sample_std_dev(historical_changes).unwrap_or(0.0);
        if std == 0.0 {
            debug!(symbol, "historical changes have zero variance, skipping move check");
            return None;
        }

        let z_score = (change_pct - mean) / std;
        let severity = self.severity_for(z_score.abs())?;
        let direction = if change_pct > 0.0 { "up" } else { "down" };

        Some(DetectedAnomaly {
            anomaly_type: AnomalyType::UnusualPriceMove,
            symbol: symbol.to_string(),
            detected_at: Utc::now(),
            severity,
            value: change_pct,
            expected_range: (mean - 2.0 * std, mean + 2.0 * std),
            z_score,
            description: format!(
                "Price moved {} {:.2}% ({:.1} std devs from mean)",
                direction,
                change_pct.abs(),
                z_score.abs()
            ),
        })
    }

    /// Run every check on the most recent bar against the preceding history.
    ///
    /// Checks whose prerequisites are missing are silently skipped; the
    /// result is the non-empty subset in fixed order volume → gap →
    /// volatility → move.
    pub fn detect_all(
        &self,
        symbol: &str,
        bars: &[PriceBar],
    ) -> Result<Vec<DetectedAnomaly>, InputError> {
        validate_bars(bars)?;

        let mut anomalies = Vec::new();
        if bars.len() < 2 {
            return Ok(anomalies);
        }

        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        // Daily percentage changes; a non-positive previous close contributes
        // nothing rather than a divide-by-zero.
        let mut historical_changes = Vec::with_capacity(closes.len() - 1);
        for pair in closes.windows(2) {
            if pair[0] > 0.0 {
                historical_changes.push((pair[1] - pair[0]) / pair[0] * 100.0);
            }
        }

        let daily_ranges: Vec<f64> = bars
            .iter()
            .filter(|b| b.close > 0.0)
            .map(|b| (b.high - b.low) / b.close * 100.0)
            .collect();
        let avg_daily_range = statistics::mean(&daily_ranges).unwrap_or(0.0);

        let current = &bars[bars.len() - 1];
        let prev = &bars[bars.len() - 2];
        let current_change_pct = if prev.close > 0.0 {
            (current.close - prev.close) / prev.close * 100.0
        } else {
            0.0
        };

        // Baselines always exclude the bar under evaluation.
        if let Some(anomaly) =
            self.detect_volume_spike(symbol, &volumes[..volumes.len() - 1], current.volume)
        {
            anomalies.push(anomaly);
        }
        if let Some(anomaly) =
            self.detect_price_gap(symbol, prev.close, current.open, avg_daily_range)
        {
            anomalies.push(anomaly);
        }
        if let Some(anomaly) = self.detect_volatility_surge(symbol, &closes) {
            anomalies.push(anomaly);
        }
        if let Some((_, history)) = historical_changes.split_last()
            && let Some(anomaly) = self.detect_unusual_move(symbol, current_change_pct, history)
        {
            anomalies.push(anomaly);
        }

        debug!(symbol, count = anomalies.len(), "anomaly scan complete");
        Ok(anomalies)
    }
}
