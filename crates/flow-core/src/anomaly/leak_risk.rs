//! Leak risk scoring for pipes
//!
//! Weighted heuristic over age, operating pressure, flow load and material.
//! Deterministic: the same pipe and clock always score the same.

use crate::models::{Material, Node, Pipe};
use crate::predictor::age_years;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_AGE_YEARS: f64 = 10.0;
const DEFAULT_PRESSURE_RATIO: f64 = 2.0 / 3.0;
const DEFAULT_FLOW_RATIO: f64 = 0.5;

/// Pressure ratio with the lowest risk contribution
const OPTIMAL_PRESSURE_RATIO: f64 = 0.7;
const OPTIMAL_FLOW_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            RiskLevel::Low
        } else if score < 0.6 {
            RiskLevel::Medium
        } else if score < 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Continue regular monitoring schedule",
            RiskLevel::Medium => "Schedule inspection within 30 days",
            RiskLevel::High => "Priority inspection required within 7 days",
            RiskLevel::Critical => "Immediate inspection and potential shutdown required",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakRiskAssessment {
    pub pipe_id: String,
    /// Score in [0, 1]
    pub leak_probability: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub contributing_factors: Vec<String>,
    pub recommendation: String,
}

/// Resolved inputs, with how many of the five (age, pressure, flow,
/// material, diameter) came from real data
#[derive(Debug, Clone, Copy)]
struct RiskInputs {
    age_years: f64,
    pressure_ratio: f64,
    flow_ratio: f64,
    material_factor: f64,
    present: usize,
}

const INPUT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct LeakRiskAssessor;

impl LeakRiskAssessor {
    pub fn new() -> Self {
        Self
    }

    /// Assess `pipe`; `source` is the node feeding it, when known
    pub fn assess(&self, pipe: &Pipe, source: Option<&Node>, now: DateTime<Utc>) -> LeakRiskAssessment {
        let inputs = resolve_inputs(pipe, source, now);

        let score = (inputs.age_years / 20.0).min(1.0) * 0.3
            + (inputs.pressure_ratio - OPTIMAL_PRESSURE_RATIO).abs() * 0.25
            + (inputs.flow_ratio - OPTIMAL_FLOW_RATIO).abs() * 0.25
            + inputs.material_factor * 0.2;
        let score = score.clamp(0.0, 1.0);

        let risk_level = RiskLevel::from_score(score);
        let completeness = inputs.present as f64 / INPUT_COUNT as f64;

        LeakRiskAssessment {
            pipe_id: pipe.id.clone(),
            leak_probability: (score * 1000.0).round() / 1000.0,
            risk_level,
            confidence: 0.7 + 0.25 * completeness,
            contributing_factors: factors(&inputs),
            recommendation: risk_level.recommendation().to_string(),
        }
    }
}

fn material_factor(material: Material) -> f64 {
    match material {
        Material::Steel => 0.8,
        Material::Pvc => 0.6,
        Material::Concrete => 0.9,
        Material::CastIron => 1.0,
    }
}

fn resolve_inputs(pipe: &Pipe, source: Option<&Node>, now: DateTime<Utc>) -> RiskInputs {
    let mut present = 0;

    let age_years = match pipe.installation_date {
        Some(_) => {
            present += 1;
            age_years(&pipe.clone().into(), now)
        }
        None => DEFAULT_AGE_YEARS,
    };

    let pressure_ratio = match source.and_then(|n| n.pressure.zip(n.max_pressure)) {
        Some((pressure, max)) if max > 0.0 => {
            present += 1;
            pressure / max
        }
        _ => DEFAULT_PRESSURE_RATIO,
    };

    let flow_ratio = match (pipe.current_flow, pipe.flow_capacity) {
        (Some(flow), Some(capacity)) if capacity > 0.0 => {
            present += 1;
            flow / capacity
        }
        _ => DEFAULT_FLOW_RATIO,
    };

    let material_factor = match pipe.material {
        Some(material) => {
            present += 1;
            material_factor(material)
        }
        None => material_factor(Material::Steel),
    };

    if pipe.diameter.is_some() {
        present += 1;
    }

    RiskInputs {
        age_years,
        pressure_ratio,
        flow_ratio,
        material_factor,
        present,
    }
}

fn factors(inputs: &RiskInputs) -> Vec<String> {
    let mut factors = Vec::new();

    if inputs.age_years > 15.0 {
        factors.push("Pipe age exceeds recommended lifespan");
    }
    if inputs.pressure_ratio > 0.9 {
        factors.push("Operating near maximum pressure");
    } else if inputs.pressure_ratio < 0.4 {
        factors.push("Unusually low pressure detected");
    }
    if inputs.flow_ratio > 0.8 {
        factors.push("High flow rate stress");
    }
    if inputs.material_factor > 0.9 {
        factors.push("Material susceptible to corrosion");
    }

    if factors.is_empty() {
        factors.push(crate::predictor::NORMAL_CONDITIONS);
    }
    factors.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComponentStatus, NodeKind};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn bare_pipe() -> Pipe {
        Pipe {
            id: "PIPE-X".to_string(),
            source_node_id: "NODE-A".to_string(),
            target_node_id: "NODE-B".to_string(),
            length: None,
            diameter: None,
            material: None,
            flow_capacity: None,
            current_flow: None,
            pressure_loss: None,
            installation_date: None,
            last_inspection: None,
            status: ComponentStatus::Operational,
        }
    }

    fn source(pressure: f64, max_pressure: f64) -> Node {
        Node {
            id: "NODE-A".to_string(),
            name: None,
            kind: NodeKind::Pump,
            pressure: Some(pressure),
            max_pressure: Some(max_pressure),
            flow_rate: None,
            latitude: None,
            longitude: None,
            status: ComponentStatus::Active,
            installation_date: None,
            last_updated: None,
        }
    }

    #[test]
    fn test_bare_pipe_uses_defaults() {
        let assessment = LeakRiskAssessor::new().assess(&bare_pipe(), None, now());
        // 0.5*0.3 + (0.7-2/3)*0.25 + 0.1*0.25 + 0.8*0.2
        let expected = 0.15 + (0.7 - 2.0 / 3.0) * 0.25 + 0.025 + 0.16;
        assert!((assessment.leak_probability - (expected * 1000.0f64).round() / 1000.0).abs() < 1e-9);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert!((assessment.confidence - 0.7).abs() < 1e-9);
        assert_eq!(assessment.contributing_factors, vec!["Normal operating conditions"]);
        assert_eq!(assessment.recommendation, "Schedule inspection within 30 days");
    }

    #[test]
    fn test_old_cast_iron_under_stress_is_critical() {
        let mut pipe = bare_pipe();
        pipe.installation_date = Some(now() - Duration::days(365 * 30));
        pipe.material = Some(Material::CastIron);
        pipe.diameter = Some(300.0);
        pipe.current_flow = Some(1000.0);
        pipe.flow_capacity = Some(1000.0);

        let assessment = LeakRiskAssessor::new().assess(&pipe, Some(&source(0.4, 4.0)), now());
        // 0.3 + 0.6*0.25 + 0.4*0.25 + 0.2 = 0.75
        assert!((assessment.leak_probability - 0.75).abs() < 1e-9);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!((assessment.confidence - 0.95).abs() < 1e-9);
        assert_eq!(
            assessment.contributing_factors,
            vec![
                "Pipe age exceeds recommended lifespan",
                "Unusually low pressure detected",
                "High flow rate stress",
                "Material susceptible to corrosion",
            ]
        );
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let assessor = LeakRiskAssessor::new();
        let pipe = bare_pipe();
        assert_eq!(assessor.assess(&pipe, None, now()), assessor.assess(&pipe, None, now()));
    }

    #[test]
    fn test_score_is_clamped() {
        let mut pipe = bare_pipe();
        pipe.installation_date = Some(now() - Duration::days(365 * 50));
        pipe.material = Some(Material::CastIron);
        pipe.current_flow = Some(50_000.0);
        pipe.flow_capacity = Some(100.0);
        let assessment = LeakRiskAssessor::new().assess(&pipe, Some(&source(40.0, 4.0)), now());
        assert_eq!(assessment.leak_probability, 1.0);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert!(assessment
            .contributing_factors
            .contains(&"Operating near maximum pressure".to_string()));
    }
}
