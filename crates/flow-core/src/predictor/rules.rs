//! Rule-based maintenance interval estimate
//!
//! Deterministic, no learned parameters. Used whenever the regressor is
//! unavailable or fails on a call.

use crate::models::{ComponentKind, ComponentRecord, Material};

/// Rule-based estimates never go below this many days
pub const RULE_MIN_DAYS: f64 = 30.0;

/// Heuristic interval estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedEstimator;

impl RuleBasedEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Days until maintenance for `record` at the given age
    pub fn estimate(&self, record: &ComponentRecord, age_years: f64) -> f64 {
        let mut days = base_interval_days(record);

        if age_years > 15.0 {
            days *= 0.7;
        } else if age_years > 10.0 {
            days *= 0.85;
        }

        if record.status().needs_attention() {
            days *= 0.5;
        }

        days.max(RULE_MIN_DAYS)
    }
}

/// Pipes are keyed by material, nodes by type
fn base_interval_days(record: &ComponentRecord) -> f64 {
    match record {
        ComponentRecord::Pipe(pipe) => match pipe.material.unwrap_or(Material::Steel) {
            Material::Steel => 180.0,
            Material::Pvc => 365.0,
            Material::Concrete => 270.0,
            Material::CastIron => 120.0,
        },
        ComponentRecord::Node(_) => match record.kind() {
            ComponentKind::Pump => 90.0,
            ComponentKind::Valve => 180.0,
            ComponentKind::Sensor => 365.0,
            ComponentKind::Junction => 730.0,
            ComponentKind::Pipe => 365.0,
        },
    }
}
