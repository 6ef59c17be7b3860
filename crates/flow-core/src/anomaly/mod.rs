//! Anomaly detection and leak risk for the pipeline network
//!
//! This module provides:
//! - Out-of-band checks on single sensor readings
//! - Sustained pressure drop detection over a node's history
//! - Leak risk scoring for pipes
//! - Alert raising with deduplication against open alerts

mod alerts;
mod leak_risk;
mod pressure_drop;
mod readings;

pub use alerts::{raise_alerts, AnomalyMonitor};
pub use leak_risk::{LeakRiskAssessment, LeakRiskAssessor, RiskLevel};
pub use pressure_drop::{PressureDropAnomaly, PressureDropDetector};
pub use readings::{ReadingAnomaly, ReadingAnomalyDetector, ReadingThresholds};
