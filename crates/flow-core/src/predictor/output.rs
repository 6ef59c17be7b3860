//! Prediction post-processing
//!
//! Turns a raw day count into a bounded, scored and explained
//! [`PredictionResult`].

use super::features::resolve_material;
use crate::models::{
    ComponentKind, ComponentRecord, FeatureVector, MaintenanceType, Material, PredictionResult,
    PredictionSource, Priority,
};
use chrono::{DateTime, Duration, Utc};

/// Shortest interval ever reported
pub const MIN_DAYS: f64 = 7.0;

/// Longest interval ever reported (two years)
pub const MAX_DAYS: f64 = 730.0;

pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 0.95;

const BASE_CONFIDENCE: f64 = 0.8;

/// Emitted when no other factor applies
pub const NORMAL_CONDITIONS: &str = "Normal operating conditions";

/// Thresholds for the post-processor
#[derive(Debug, Clone)]
struct OutputConfig {
    /// Below this many days priority is high
    high_priority_days: f64,
    /// Below this many days priority is medium
    medium_priority_days: f64,
    /// Age in years above which a component counts as old
    high_age_years: f64,
    moderate_age_years: f64,
    high_utilization: f64,
    low_utilization: f64,
    overdue_inspection_days: f64,
    due_inspection_days: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            high_priority_days: 30.0,
            medium_priority_days: 90.0,
            high_age_years: 15.0,
            moderate_age_years: 10.0,
            high_utilization: 0.8,
            low_utilization: 0.3,
            overdue_inspection_days: 365.0,
            due_inspection_days: 180.0,
        }
    }
}

/// Formats raw day counts into prediction results
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self { config: OutputConfig::default() }
    }

    /// Build the final result for `record`
    ///
    /// `features` must have been derived from `record` at `now`.
    pub fn finalize(
        &self,
        raw_days: f64,
        record: &ComponentRecord,
        features: &FeatureVector,
        source: PredictionSource,
        now: DateTime<Utc>,
    ) -> PredictionResult {
        let raw_days = if raw_days.is_finite() { raw_days } else { MAX_DAYS };
        let days = raw_days.clamp(MIN_DAYS, MAX_DAYS).trunc();
        let days_whole = days as i64;

        PredictionResult {
            next_maintenance_date: now + Duration::days(days_whole),
            days_until_maintenance: days_whole,
            priority: self.priority(days),
            confidence: self.confidence(record.kind(), raw_days),
            source,
            maintenance_type: self.maintenance_type(record, features, days),
            estimated_cost: self.estimated_cost(record, features, days),
            contributing_factors: self.contributing_factors(record, features),
        }
    }

    pub fn priority(&self, days: f64) -> Priority {
        if days < self.config.high_priority_days {
            Priority::High
        } else if days < self.config.medium_priority_days {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    /// Confidence from the per-type table, adjusted by how plausible the raw estimate is
    pub fn confidence(&self, kind: ComponentKind, raw_days: f64) -> f64 {
        let mut confidence = (BASE_CONFIDENCE + type_confidence(kind)) / 2.0;

        if (30.0..=365.0).contains(&raw_days) {
            confidence += 0.05;
        } else if raw_days < 30.0 || raw_days > MAX_DAYS {
            confidence -= 0.2;
        }

        confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }

    pub fn maintenance_type(
        &self,
        record: &ComponentRecord,
        features: &FeatureVector,
        days: f64,
    ) -> MaintenanceType {
        use crate::models::ComponentStatus::*;

        match record.status() {
            Damaged | Offline => return MaintenanceType::Repair,
            Maintenance => return MaintenanceType::Replacement,
            _ => {}
        }

        if days < self.config.high_priority_days {
            MaintenanceType::UrgentInspection
        } else if features.age_years as f64 > self.config.high_age_years {
            MaintenanceType::ReplacementAssessment
        } else {
            match record.kind() {
                ComponentKind::Pump | ComponentKind::Sensor => MaintenanceType::Calibration,
                ComponentKind::Valve | ComponentKind::Junction => MaintenanceType::Inspection,
                ComponentKind::Pipe => MaintenanceType::RoutineInspection,
            }
        }
    }

    /// Cost in the service currency, rounded to cents
    pub fn estimated_cost(&self, record: &ComponentRecord, features: &FeatureVector, days: f64) -> f64 {
        let kind = record.kind();
        let mut cost = base_cost(kind);
        if kind == ComponentKind::Pipe {
            cost *= features.size_metric as f64 / 1000.0;
        }

        let urgency = if days < self.config.high_priority_days {
            1.5
        } else if days < self.config.medium_priority_days {
            1.2
        } else {
            1.0
        };

        let total = cost * urgency * material_cost_factor(resolve_material(record));
        (total * 100.0).round() / 100.0
    }

    /// Ordered explanation list; never empty
    pub fn contributing_factors(&self, record: &ComponentRecord, features: &FeatureVector) -> Vec<String> {
        let cfg = &self.config;
        let mut factors = Vec::new();

        let age = features.age_years as f64;
        if age > cfg.high_age_years {
            factors.push("High component age");
        } else if age > cfg.moderate_age_years {
            factors.push("Moderate component age");
        }

        let utilization = features.utilization_ratio as f64;
        if utilization > cfg.high_utilization {
            factors.push("High utilization");
        } else if utilization < cfg.low_utilization {
            factors.push("Low utilization");
        }

        let inspection = features.days_since_inspection as f64;
        if inspection > cfg.overdue_inspection_days {
            factors.push("Overdue inspection");
        } else if inspection > cfg.due_inspection_days {
            factors.push("Inspection due soon");
        }

        if matches!(resolve_material(record), Material::CastIron | Material::Concrete) {
            factors.push("Frequent maintenance material");
        }

        if record.status().needs_attention() {
            factors.push("Status requires attention");
        }

        match record.kind() {
            ComponentKind::Pump => factors.push("Pump mechanical wear"),
            ComponentKind::Sensor => factors.push("Sensor calibration drift"),
            ComponentKind::Valve => factors.push("Valve seal and actuator wear"),
            ComponentKind::Pipe | ComponentKind::Junction => {}
        }

        if factors.is_empty() {
            factors.push(NORMAL_CONDITIONS);
        }
        factors.into_iter().map(String::from).collect()
    }
}

fn type_confidence(kind: ComponentKind) -> f64 {
    match kind {
        ComponentKind::Pump => 0.9,
        ComponentKind::Valve => 0.85,
        ComponentKind::Pipe => 0.9,
        ComponentKind::Sensor => 0.75,
        ComponentKind::Junction => 0.8,
    }
}

/// Pipes are priced per 1000 length units
fn base_cost(kind: ComponentKind) -> f64 {
    match kind {
        ComponentKind::Pump => 200_000.0,
        ComponentKind::Valve => 65_000.0,
        ComponentKind::Sensor => 32_000.0,
        ComponentKind::Junction => 95_000.0,
        ComponentKind::Pipe => 12_000.0,
    }
}

fn material_cost_factor(material: Material) -> f64 {
    match material {
        Material::Steel => 1.0,
        Material::Pvc => 0.8,
        Material::Concrete => 1.3,
        Material::CastIron => 1.4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComponentStatus, Node, NodeKind, Pipe};
    use crate::predictor::FeatureDeriver;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn pipe(status: ComponentStatus) -> Pipe {
        Pipe {
            id: "PIPE-T".to_string(),
            source_node_id: "A".to_string(),
            target_node_id: "B".to_string(),
            length: Some(2500.0),
            diameter: Some(300.0),
            material: Some(Material::Steel),
            flow_capacity: Some(1000.0),
            current_flow: Some(500.0),
            pressure_loss: Some(0.2),
            installation_date: Some(now() - Duration::days(365 * 3)),
            last_inspection: Some(now() - Duration::days(30)),
            status,
        }
    }

    fn node(kind: NodeKind, status: ComponentStatus) -> ComponentRecord {
        ComponentRecord::Node(Node {
            id: "N".to_string(),
            name: None,
            kind,
            pressure: None,
            max_pressure: None,
            flow_rate: None,
            latitude: None,
            longitude: None,
            status,
            installation_date: None,
            last_updated: None,
        })
    }

    fn finalize(raw_days: f64, record: &ComponentRecord) -> PredictionResult {
        let features = FeatureDeriver::new().derive_at(record, now());
        OutputFormatter::new().finalize(raw_days, record, &features, PredictionSource::Model, now())
    }

    #[test]
    fn test_priority_thresholds() {
        let f = OutputFormatter::new();
        assert_eq!(f.priority(200.0), Priority::Low);
        assert_eq!(f.priority(100.0), Priority::Low);
        assert_eq!(f.priority(90.0), Priority::Low);
        assert_eq!(f.priority(89.0), Priority::Medium);
        assert_eq!(f.priority(50.0), Priority::Medium);
        assert_eq!(f.priority(30.0), Priority::Medium);
        assert_eq!(f.priority(29.0), Priority::High);
        assert_eq!(f.priority(10.0), Priority::High);
    }

    #[test]
    fn test_priority_is_monotonic_in_days() {
        let record: ComponentRecord = pipe(ComponentStatus::Operational).into();
        let tiers: Vec<Priority> = [200.0, 100.0, 50.0, 10.0]
            .iter()
            .map(|d| finalize(*d, &record).priority)
            .collect();
        assert_eq!(tiers, vec![Priority::Low, Priority::Low, Priority::Medium, Priority::High]);
        assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_days_bounded() {
        let record: ComponentRecord = pipe(ComponentStatus::Operational).into();
        assert_eq!(finalize(0.0, &record).days_until_maintenance, 7);
        assert_eq!(finalize(-50.0, &record).days_until_maintenance, 7);
        assert_eq!(finalize(10_000.0, &record).days_until_maintenance, 730);
        assert_eq!(finalize(f64::NAN, &record).days_until_maintenance, 730);
        assert_eq!(finalize(123.9, &record).days_until_maintenance, 123);
    }

    #[test]
    fn test_next_date_matches_day_count() {
        let record: ComponentRecord = pipe(ComponentStatus::Operational).into();
        let result = finalize(100.0, &record);
        assert_eq!(result.next_maintenance_date, now() + Duration::days(100));
    }

    #[test]
    fn test_confidence_always_bounded() {
        let f = OutputFormatter::new();
        let kinds = [
            ComponentKind::Pipe,
            ComponentKind::Pump,
            ComponentKind::Valve,
            ComponentKind::Sensor,
            ComponentKind::Junction,
        ];
        for kind in kinds {
            for raw in [-1e9, 0.0, 7.0, 29.9, 30.0, 200.0, 365.0, 366.0, 730.0, 731.0, 1e9] {
                let c = f.confidence(kind, raw);
                assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c), "{kind} {raw} -> {c}");
            }
        }
    }

    #[test]
    fn test_confidence_values() {
        let f = OutputFormatter::new();
        assert!((f.confidence(ComponentKind::Pump, 100.0) - 0.9).abs() < 1e-9);
        assert!((f.confidence(ComponentKind::Sensor, 500.0) - 0.775).abs() < 1e-9);
        assert!((f.confidence(ComponentKind::Sensor, 10.0) - 0.575).abs() < 1e-9);
        assert!((f.confidence(ComponentKind::Pipe, 1000.0) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_maintenance_type_precedence() {
        let damaged: ComponentRecord = pipe(ComponentStatus::Damaged).into();
        assert_eq!(finalize(10.0, &damaged).maintenance_type, MaintenanceType::Repair);

        let offline = node(NodeKind::Valve, ComponentStatus::Offline);
        assert_eq!(finalize(300.0, &offline).maintenance_type, MaintenanceType::Repair);

        let maintenance: ComponentRecord = pipe(ComponentStatus::Maintenance).into();
        assert_eq!(finalize(10.0, &maintenance).maintenance_type, MaintenanceType::Replacement);

        let ok: ComponentRecord = pipe(ComponentStatus::Operational).into();
        assert_eq!(finalize(10.0, &ok).maintenance_type, MaintenanceType::UrgentInspection);
        assert_eq!(finalize(200.0, &ok).maintenance_type, MaintenanceType::RoutineInspection);

        // Junction default age is 15, which is not above the threshold
        let junction = node(NodeKind::Junction, ComponentStatus::Active);
        assert_eq!(finalize(200.0, &junction).maintenance_type, MaintenanceType::Inspection);

        let mut old = pipe(ComponentStatus::Operational);
        old.installation_date = Some(now() - Duration::days(365 * 20));
        assert_eq!(
            finalize(200.0, &old.into()).maintenance_type,
            MaintenanceType::ReplacementAssessment
        );
    }

    #[test]
    fn test_node_default_maintenance_types() {
        let pump = node(NodeKind::Pump, ComponentStatus::Active);
        let sensor = node(NodeKind::Sensor, ComponentStatus::Active);
        let valve = node(NodeKind::Valve, ComponentStatus::Active);
        assert_eq!(finalize(200.0, &pump).maintenance_type, MaintenanceType::Calibration);
        assert_eq!(finalize(200.0, &sensor).maintenance_type, MaintenanceType::Calibration);
        assert_eq!(finalize(200.0, &valve).maintenance_type, MaintenanceType::Inspection);
    }

    #[test]
    fn test_pipe_cost_scales_with_length_urgency_material() {
        let mut p = pipe(ComponentStatus::Operational);
        // 12000 * 2.5 * 1.0 * 1.0
        assert_eq!(finalize(200.0, &p.clone().into()).estimated_cost, 30_000.0);
        // urgency 1.2
        assert_eq!(finalize(60.0, &p.clone().into()).estimated_cost, 36_000.0);
        // urgency 1.5, cast iron 1.4
        p.material = Some(Material::CastIron);
        assert_eq!(finalize(10.0, &p.into()).estimated_cost, 63_000.0);
    }

    #[test]
    fn test_node_cost_uses_default_material() {
        // sensor defaults to pvc: 32000 * 0.8
        let sensor = node(NodeKind::Sensor, ComponentStatus::Active);
        assert_eq!(finalize(200.0, &sensor).estimated_cost, 25_600.0);
        // junction defaults to concrete: 95000 * 1.3
        let junction = node(NodeKind::Junction, ComponentStatus::Active);
        assert_eq!(finalize(200.0, &junction).estimated_cost, 123_500.0);
    }

    #[test]
    fn test_cost_rounded_to_cents() {
        let mut p = pipe(ComponentStatus::Operational);
        p.length = Some(1234.567);
        let cost = finalize(200.0, &p.into()).estimated_cost;
        assert_eq!(cost, (cost * 100.0).round() / 100.0);
    }

    #[test]
    fn test_factors_sentinel_when_nothing_applies() {
        let record: ComponentRecord = pipe(ComponentStatus::Operational).into();
        assert_eq!(finalize(200.0, &record).contributing_factors, vec![NORMAL_CONDITIONS]);
    }

    #[test]
    fn test_factors_order() {
        let mut p = pipe(ComponentStatus::Damaged);
        p.installation_date = Some(now() - Duration::days(365 * 12));
        p.current_flow = Some(950.0);
        p.last_inspection = Some(now() - Duration::days(200));
        p.material = Some(Material::Concrete);
        let factors = finalize(100.0, &p.into()).contributing_factors;
        assert_eq!(
            factors,
            vec![
                "Moderate component age",
                "High utilization",
                "Inspection due soon",
                "Frequent maintenance material",
                "Status requires attention",
            ]
        );
    }

    #[test]
    fn test_factors_type_notes() {
        let pump = node(NodeKind::Pump, ComponentStatus::Active);
        let factors = finalize(200.0, &pump).contributing_factors;
        assert_eq!(factors.last().map(String::as_str), Some("Pump mechanical wear"));
        assert!(!factors.iter().any(|f| f == NORMAL_CONDITIONS));
    }
}
