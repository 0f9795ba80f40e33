pub mod application;
pub mod config;
pub mod domain;

pub use application::aggregator::SignalAggregator;
pub use application::anomalies::AnomalyDetector;
pub use application::interpreter::IndicatorAnalyzer;
pub use application::scoring::TechnicalScorer;
pub use config::{AnalysisConfig, AnomalyConfig};
pub use domain::errors::InputError;
pub use domain::types::{
    CrossoverEvent, CrossoverKind, DetectedAnomaly, IndicatorResult, PriceBar, Severity, Signal,
    SignalSummary,
};
