pub mod aggregator;
pub mod anomalies;
pub mod indicators;
pub mod interpreter;
pub mod scoring;
pub mod statistics;
