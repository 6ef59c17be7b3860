//! Feature derivation for maintenance inference
//!
//! Maps a pipe or node record onto the fixed 15-column feature vector the
//! regressor was trained on. Every column has a per-type default, so
//! derivation is total over any well-formed record.

use crate::models::{ComponentKind, ComponentRecord, FeatureVector, Material, FEATURE_COUNT};
use chrono::{DateTime, Utc};
use tracing::warn;

const DAYS_PER_YEAR: f64 = 365.25;

/// Utilization used when nothing else is known
const DEFAULT_UTILIZATION: f64 = 0.5;

const DEFAULT_CURRENT_FLOW: f64 = 500.0;
const DEFAULT_FLOW_CAPACITY: f64 = 1000.0;
const DEFAULT_PRESSURE_LOSS: f64 = 0.1;
const DEFAULT_SIZE: f64 = 1000.0;

/// Derives feature vectors from component records
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureDeriver;

impl FeatureDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Derive features against the current wall clock
    pub fn derive(&self, record: &ComponentRecord) -> FeatureVector {
        self.derive_at(record, Utc::now())
    }

    /// Derive features against a fixed clock
    pub fn derive_at(&self, record: &ComponentRecord, now: DateTime<Utc>) -> FeatureVector {
        let kind = record.kind();
        let age_years = age_years(record, now);
        let (current_flow, flow_capacity) = flows(record);
        let utilization = utilization_ratio(record);
        let material = resolve_material(record);
        let status = record.status();

        let vector = FeatureVector {
            age_years: age_years as f32,
            size_metric: size_metric(record) as f32,
            diameter_equivalent: diameter_equivalent(record, flow_capacity) as f32,
            current_flow: current_flow as f32,
            flow_capacity: flow_capacity as f32,
            pressure_loss: pressure_loss(record, utilization) as f32,
            utilization_ratio: utilization as f32,
            days_since_inspection: days_since_inspection(record, now) as f32,
            maintenance_count: (age_years * annual_maintenance_rate(kind)).trunc() as f32,
            material_concrete: indicator(material == Material::Concrete),
            material_pvc: indicator(material == Material::Pvc),
            material_steel: indicator(material == Material::Steel),
            status_maintenance: indicator(status.is_maintenance()),
            status_operational: indicator(status.is_operational()),
            node_indicator: indicator(record.is_node()),
        };

        sanitize(record.id(), vector)
    }
}

fn indicator(flag: bool) -> f32 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Replace non-finite columns with 0.
///
/// Reaching the warning means a derivation rule produced NaN/inf, which is a bug.
fn sanitize(component_id: &str, vector: FeatureVector) -> FeatureVector {
    let values = vector.to_array();
    let bad: Vec<usize> = (0..FEATURE_COUNT).filter(|&i| !values[i].is_finite()).collect();
    if bad.is_empty() {
        return vector;
    }

    warn!(
        component_id = %component_id,
        columns = ?bad,
        "Non-finite feature values derived, zeroing"
    );

    let fix = |v: f32| if v.is_finite() { v } else { 0.0 };
    FeatureVector {
        age_years: fix(vector.age_years),
        size_metric: fix(vector.size_metric),
        diameter_equivalent: fix(vector.diameter_equivalent),
        current_flow: fix(vector.current_flow),
        flow_capacity: fix(vector.flow_capacity),
        pressure_loss: fix(vector.pressure_loss),
        utilization_ratio: fix(vector.utilization_ratio),
        days_since_inspection: fix(vector.days_since_inspection),
        maintenance_count: fix(vector.maintenance_count),
        material_concrete: fix(vector.material_concrete),
        material_pvc: fix(vector.material_pvc),
        material_steel: fix(vector.material_steel),
        status_maintenance: fix(vector.status_maintenance),
        status_operational: fix(vector.status_operational),
        node_indicator: fix(vector.node_indicator),
    }
}

/// Age in years, or the per-type default when installation date is unknown
pub fn age_years(record: &ComponentRecord, now: DateTime<Utc>) -> f64 {
    match record.installation_date() {
        Some(installed) => ((now - installed).num_days() as f64 / DAYS_PER_YEAR).max(0.0),
        None => default_age_years(record.kind()),
    }
}

fn default_age_years(kind: ComponentKind) -> f64 {
    match kind {
        ComponentKind::Pump => 8.0,
        ComponentKind::Valve => 12.0,
        ComponentKind::Sensor => 5.0,
        ComponentKind::Junction => 15.0,
        ComponentKind::Pipe => 10.0,
    }
}

/// Days since last inspection (pipes) or last update (nodes)
pub fn days_since_inspection(record: &ComponentRecord, now: DateTime<Utc>) -> f64 {
    match record.last_checked() {
        Some(checked) => ((now - checked).num_days() as f64).max(0.0),
        None => match record.kind() {
            ComponentKind::Pump => 90.0,
            ComponentKind::Valve => 180.0,
            ComponentKind::Sensor => 365.0,
            ComponentKind::Junction => 270.0,
            ComponentKind::Pipe => 365.0,
        },
    }
}

/// Fraction of capacity in use, always within [0, 1]
pub fn utilization_ratio(record: &ComponentRecord) -> f64 {
    let ratio = match record {
        ComponentRecord::Pipe(pipe) => match (pipe.current_flow, pipe.flow_capacity) {
            (Some(flow), Some(capacity)) if capacity > 0.0 => flow / capacity,
            _ => DEFAULT_UTILIZATION,
        },
        ComponentRecord::Node(node) => match (node.pressure, node.max_pressure, node.flow_rate) {
            (Some(pressure), Some(max), _) if max > 0.0 => pressure / max,
            (_, _, Some(flow_rate)) => flow_rate / estimated_capacity(record.kind()),
            _ => DEFAULT_UTILIZATION,
        },
    };
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        DEFAULT_UTILIZATION
    }
}

fn estimated_capacity(kind: ComponentKind) -> f64 {
    match kind {
        ComponentKind::Pump => 2000.0,
        ComponentKind::Junction => 1500.0,
        ComponentKind::Valve => 1000.0,
        ComponentKind::Sensor => 800.0,
        ComponentKind::Pipe => DEFAULT_FLOW_CAPACITY,
    }
}

/// Pipe length, or a synthetic size for nodes
pub fn size_metric(record: &ComponentRecord) -> f64 {
    match record {
        ComponentRecord::Pipe(pipe) => pipe.length.unwrap_or(DEFAULT_SIZE),
        ComponentRecord::Node(_) => match record.kind() {
            ComponentKind::Pump => 5000.0,
            ComponentKind::Junction => 2000.0,
            ComponentKind::Valve => 1000.0,
            ComponentKind::Sensor => 500.0,
            ComponentKind::Pipe => DEFAULT_SIZE,
        },
    }
}

fn diameter_equivalent(record: &ComponentRecord, flow_capacity: f64) -> f64 {
    let explicit = match record {
        ComponentRecord::Pipe(pipe) => pipe.diameter,
        ComponentRecord::Node(_) => None,
    };
    explicit.unwrap_or_else(|| (flow_capacity / 5.0).clamp(100.0, 500.0))
}

/// Resolved (current_flow, flow_capacity)
fn flows(record: &ComponentRecord) -> (f64, f64) {
    let (flow, capacity) = match record {
        ComponentRecord::Pipe(pipe) => (pipe.current_flow, pipe.flow_capacity),
        ComponentRecord::Node(node) => (node.flow_rate, None),
    };

    let capacity = capacity.or_else(|| flow.map(|f| f * capacity_multiplier(record.kind())));
    (
        flow.unwrap_or(DEFAULT_CURRENT_FLOW),
        capacity.unwrap_or(DEFAULT_FLOW_CAPACITY),
    )
}

fn capacity_multiplier(kind: ComponentKind) -> f64 {
    match kind {
        ComponentKind::Pump => 1.5,
        ComponentKind::Junction => 1.3,
        ComponentKind::Valve => 1.2,
        ComponentKind::Sensor => 1.1,
        ComponentKind::Pipe => 1.2,
    }
}

fn pressure_loss(record: &ComponentRecord, utilization: f64) -> f64 {
    match record {
        ComponentRecord::Pipe(pipe) => pipe.pressure_loss.unwrap_or(DEFAULT_PRESSURE_LOSS),
        ComponentRecord::Node(node) => match (node.pressure, node.max_pressure) {
            (Some(_), Some(_)) => utilization * 0.3,
            _ => DEFAULT_PRESSURE_LOSS,
        },
    }
}

fn annual_maintenance_rate(kind: ComponentKind) -> f64 {
    match kind {
        ComponentKind::Pump => 2.0,
        ComponentKind::Valve => 1.0,
        ComponentKind::Sensor => 1.5,
        ComponentKind::Junction => 0.5,
        ComponentKind::Pipe => 0.3,
    }
}

/// Explicit pipe material, or the per-type default
pub fn resolve_material(record: &ComponentRecord) -> Material {
    match record {
        ComponentRecord::Pipe(pipe) => pipe.material.unwrap_or(Material::Steel),
        ComponentRecord::Node(_) => match record.kind() {
            ComponentKind::Sensor => Material::Pvc,
            ComponentKind::Junction => Material::Concrete,
            _ => Material::Steel,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComponentStatus, Node, NodeKind, Pipe};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn bare_node(kind: NodeKind, status: ComponentStatus) -> ComponentRecord {
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

    fn bare_pipe(status: ComponentStatus) -> Pipe {
        Pipe {
            id: "P".to_string(),
            source_node_id: String::new(),
            target_node_id: String::new(),
            length: None,
            diameter: None,
            material: None,
            flow_capacity: None,
            current_flow: None,
            pressure_loss: None,
            installation_date: None,
            last_inspection: None,
            status,
        }
    }

    #[test]
    fn test_bare_pipe_uses_defaults() {
        let record = ComponentRecord::Pipe(bare_pipe(ComponentStatus::Operational));
        let f = FeatureDeriver::new().derive_at(&record, now());

        assert_eq!(f.age_years, 10.0);
        assert_eq!(f.size_metric, 1000.0);
        assert_eq!(f.diameter_equivalent, 200.0);
        assert_eq!(f.current_flow, 500.0);
        assert_eq!(f.flow_capacity, 1000.0);
        assert!((f.pressure_loss - 0.1).abs() < 1e-6);
        assert_eq!(f.utilization_ratio, 0.5);
        assert_eq!(f.days_since_inspection, 365.0);
        assert_eq!(f.maintenance_count, 3.0);
        assert_eq!((f.material_concrete, f.material_pvc, f.material_steel), (0.0, 0.0, 1.0));
        assert_eq!((f.status_maintenance, f.status_operational), (0.0, 1.0));
        assert_eq!(f.node_indicator, 0.0);
    }

    #[test]
    fn test_bare_nodes_all_finite_and_consistent() {
        let deriver = FeatureDeriver::new();
        for kind in [NodeKind::Pump, NodeKind::Valve, NodeKind::Sensor, NodeKind::Junction] {
            for status in [
                ComponentStatus::Operational,
                ComponentStatus::Active,
                ComponentStatus::Maintenance,
                ComponentStatus::Damaged,
                ComponentStatus::Offline,
                ComponentStatus::Leak,
                ComponentStatus::Demand,
                ComponentStatus::Unreported,
            ] {
                let f = deriver.derive_at(&bare_node(kind, status), now());
                let values = f.to_array();
                assert_eq!(values.len(), FEATURE_COUNT);
                assert!(values.iter().all(|v| v.is_finite()));

                let material_sum = f.material_concrete + f.material_pvc + f.material_steel;
                assert_eq!(material_sum, 1.0, "node default material is never cast iron");
                assert!(f.status_maintenance + f.status_operational <= 1.0);
                assert_eq!(f.node_indicator, 1.0);
            }
        }
    }

    #[test]
    fn test_sensor_defaults() {
        let record = bare_node(NodeKind::Sensor, ComponentStatus::Active);
        let f = FeatureDeriver::new().derive_at(&record, now());
        assert_eq!(f.age_years, 5.0);
        assert_eq!(f.days_since_inspection, 365.0);
        assert_eq!(f.utilization_ratio, 0.5);
        assert_eq!(f.size_metric, 500.0);
        assert_eq!(f.maintenance_count, 7.0);
        assert_eq!(f.material_pvc, 1.0);
    }

    #[test]
    fn test_age_from_installation_date() {
        let mut pipe = bare_pipe(ComponentStatus::Operational);
        pipe.installation_date = Some(now() - Duration::days(3653));
        let f = FeatureDeriver::new().derive_at(&pipe.into(), now());
        assert!((f.age_years - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_future_dates_floor_at_zero() {
        let mut pipe = bare_pipe(ComponentStatus::Operational);
        pipe.installation_date = Some(now() + Duration::days(30));
        pipe.last_inspection = Some(now() + Duration::days(5));
        let f = FeatureDeriver::new().derive_at(&pipe.into(), now());
        assert_eq!(f.age_years, 0.0);
        assert_eq!(f.days_since_inspection, 0.0);
        assert_eq!(f.maintenance_count, 0.0);
    }

    #[test]
    fn test_pipe_utilization_clamped() {
        let mut pipe = bare_pipe(ComponentStatus::Operational);
        pipe.current_flow = Some(1800.0);
        pipe.flow_capacity = Some(1500.0);
        assert_eq!(utilization_ratio(&pipe.clone().into()), 1.0);

        pipe.flow_capacity = Some(0.0);
        assert_eq!(utilization_ratio(&pipe.into()), DEFAULT_UTILIZATION);
    }

    #[test]
    fn test_node_utilization_prefers_pressure() {
        let mut record = bare_node(NodeKind::Pump, ComponentStatus::Active);
        if let ComponentRecord::Node(ref mut node) = record {
            node.pressure = Some(3.2);
            node.max_pressure = Some(4.0);
            node.flow_rate = Some(1500.0);
        }
        let f = FeatureDeriver::new().derive_at(&record, now());
        assert!((f.utilization_ratio - 0.8).abs() < 1e-6);
        assert!((f.pressure_loss - 0.24).abs() < 1e-6);
        assert_eq!(f.current_flow, 1500.0);
        assert_eq!(f.flow_capacity, 2250.0);
        assert_eq!(f.diameter_equivalent, 450.0);
    }

    #[test]
    fn test_node_utilization_from_flow_rate() {
        let mut record = bare_node(NodeKind::Sensor, ComponentStatus::Active);
        if let ComponentRecord::Node(ref mut node) = record {
            node.flow_rate = Some(400.0);
        }
        assert!((utilization_ratio(&record) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cast_iron_has_no_material_indicator() {
        let mut pipe = bare_pipe(ComponentStatus::Damaged);
        pipe.material = Some(Material::CastIron);
        let f = FeatureDeriver::new().derive_at(&pipe.into(), now());
        assert_eq!((f.material_concrete, f.material_pvc, f.material_steel), (0.0, 0.0, 0.0));
        assert_eq!((f.status_maintenance, f.status_operational), (0.0, 0.0));
    }

    #[test]
    fn test_diameter_derivation_is_bounded() {
        let mut pipe = bare_pipe(ComponentStatus::Operational);
        pipe.flow_capacity = Some(100.0);
        let f = FeatureDeriver::new().derive_at(&pipe.clone().into(), now());
        assert_eq!(f.diameter_equivalent, 100.0);

        pipe.flow_capacity = Some(10_000.0);
        let f = FeatureDeriver::new().derive_at(&pipe.into(), now());
        assert_eq!(f.diameter_equivalent, 500.0);
    }

    #[test]
    fn test_non_finite_inputs_are_zeroed() {
        let mut pipe = bare_pipe(ComponentStatus::Operational);
        pipe.length = Some(f64::NAN);
        pipe.pressure_loss = Some(f64::INFINITY);
        let f = FeatureDeriver::new().derive_at(&pipe.into(), now());
        assert_eq!(f.size_metric, 0.0);
        assert_eq!(f.pressure_loss, 0.0);
    }
}
