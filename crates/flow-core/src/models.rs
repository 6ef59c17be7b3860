//! Core data models for the pipeline network

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational status shared by pipes and nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Operational,
    Active,
    Maintenance,
    Damaged,
    Offline,
    Leak,
    Demand,
    Unreported,
}

impl ComponentStatus {
    /// Status counts as "under maintenance" for the feature encoding
    pub fn is_maintenance(&self) -> bool {
        matches!(self, ComponentStatus::Maintenance | ComponentStatus::Offline)
    }

    /// Status counts as "operational" for the feature encoding
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Operational | ComponentStatus::Active)
    }

    /// Status shortens the maintenance interval and needs attention
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            ComponentStatus::Maintenance | ComponentStatus::Damaged | ComponentStatus::Offline
        )
    }

    /// Risk of postponing maintenance on a component in this state
    pub fn delay_risk(&self) -> Priority {
        match self {
            ComponentStatus::Damaged | ComponentStatus::Offline => Priority::High,
            ComponentStatus::Demand | ComponentStatus::Maintenance => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Operational => "operational",
            ComponentStatus::Active => "active",
            ComponentStatus::Maintenance => "maintenance",
            ComponentStatus::Damaged => "damaged",
            ComponentStatus::Offline => "offline",
            ComponentStatus::Leak => "leak",
            ComponentStatus::Demand => "demand",
            ComponentStatus::Unreported => "unreported",
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipe material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Steel,
    Pvc,
    Concrete,
    CastIron,
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Steel => "steel",
            Material::Pvc => "pvc",
            Material::Concrete => "concrete",
            Material::CastIron => "cast_iron",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Pump,
    Valve,
    Sensor,
    Junction,
}

/// Flattened component type used by every per-type lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Pipe,
    Pump,
    Valve,
    Sensor,
    Junction,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Pipe => "pipe",
            ComponentKind::Pump => "pump",
            ComponentKind::Valve => "valve",
            ComponentKind::Sensor => "sensor",
            ComponentKind::Junction => "junction",
        }
    }
}

impl From<NodeKind> for ComponentKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Pump => ComponentKind::Pump,
            NodeKind::Valve => ComponentKind::Valve,
            NodeKind::Sensor => ComponentKind::Sensor,
            NodeKind::Junction => ComponentKind::Junction,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipe segment between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    pub id: String,
    #[serde(default)]
    pub source_node_id: String,
    #[serde(default)]
    pub target_node_id: String,
    /// Length in meters
    #[serde(default)]
    pub length: Option<f64>,
    /// Diameter in millimeters
    #[serde(default)]
    pub diameter: Option<f64>,
    #[serde(default)]
    pub material: Option<Material>,
    /// Maximum flow in L/min
    #[serde(default)]
    pub flow_capacity: Option<f64>,
    /// Current flow in L/min
    #[serde(default)]
    pub current_flow: Option<f64>,
    /// Pressure loss across the pipe in bar
    #[serde(default)]
    pub pressure_loss: Option<f64>,
    #[serde(default)]
    pub installation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_inspection: Option<DateTime<Utc>>,
    pub status: ComponentStatus,
}

/// A pump, valve, sensor or junction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Current pressure in bar
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub max_pressure: Option<f64>,
    /// Flow rate in L/min
    #[serde(default)]
    pub flow_rate: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub status: ComponentStatus,
    #[serde(default)]
    pub installation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Input record for the maintenance predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component_type", rename_all = "lowercase")]
pub enum ComponentRecord {
    Pipe(Pipe),
    Node(Node),
}

impl ComponentRecord {
    pub fn id(&self) -> &str {
        match self {
            ComponentRecord::Pipe(p) => &p.id,
            ComponentRecord::Node(n) => &n.id,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentRecord::Pipe(_) => ComponentKind::Pipe,
            ComponentRecord::Node(n) => n.kind.into(),
        }
    }

    pub fn status(&self) -> ComponentStatus {
        match self {
            ComponentRecord::Pipe(p) => p.status,
            ComponentRecord::Node(n) => n.status,
        }
    }

    pub fn installation_date(&self) -> Option<DateTime<Utc>> {
        match self {
            ComponentRecord::Pipe(p) => p.installation_date,
            ComponentRecord::Node(n) => n.installation_date,
        }
    }

    /// Last inspection for pipes, last update for nodes
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        match self {
            ComponentRecord::Pipe(p) => p.last_inspection,
            ComponentRecord::Node(n) => n.last_updated,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, ComponentRecord::Node(_))
    }
}

impl From<Pipe> for ComponentRecord {
    fn from(pipe: Pipe) -> Self {
        ComponentRecord::Pipe(pipe)
    }
}

impl From<Node> for ComponentRecord {
    fn from(node: Node) -> Self {
        ComponentRecord::Node(node)
    }
}

/// Fixed-length numeric encoding of a component for model input
///
/// Field order matches the regressor's input columns; see [`FeatureVector::to_array`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub age_years: f32,
    pub size_metric: f32,
    pub diameter_equivalent: f32,
    pub current_flow: f32,
    pub flow_capacity: f32,
    pub pressure_loss: f32,
    pub utilization_ratio: f32,
    pub days_since_inspection: f32,
    pub maintenance_count: f32,
    pub material_concrete: f32,
    pub material_pvc: f32,
    pub material_steel: f32,
    pub status_maintenance: f32,
    pub status_operational: f32,
    pub node_indicator: f32,
}

/// Number of model input features
pub const FEATURE_COUNT: usize = 15;

impl FeatureVector {
    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.age_years,
            self.size_metric,
            self.diameter_equivalent,
            self.current_flow,
            self.flow_capacity,
            self.pressure_loss,
            self.utilization_ratio,
            self.days_since_inspection,
            self.maintenance_count,
            self.material_concrete,
            self.material_pvc,
            self.material_steel,
            self.status_maintenance,
            self.status_operational,
            self.node_indicator,
        ]
    }
}

/// Maintenance urgency tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Where a prediction's day count came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    RuleBased,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Model => "model",
            PredictionSource::RuleBased => "rule_based",
        }
    }
}

/// Recommended maintenance action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    Repair,
    Replacement,
    UrgentInspection,
    ReplacementAssessment,
    Calibration,
    Inspection,
    RoutineInspection,
}

/// Structured maintenance prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub next_maintenance_date: DateTime<Utc>,
    pub days_until_maintenance: i64,
    pub priority: Priority,
    pub confidence: f64,
    pub source: PredictionSource,
    pub maintenance_type: MaintenanceType,
    pub estimated_cost: f64,
    pub contributing_factors: Vec<String>,
}

/// Prediction tagged with the component it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentPrediction {
    pub component_id: String,
    pub component_type: ComponentKind,
    #[serde(flatten)]
    pub prediction: PredictionResult,
    pub risk_if_delayed: Priority,
}

/// Entity class referenced by maintenance logs and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Pipe,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// A scheduled or performed maintenance task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub id: u64,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub scheduled_date: DateTime<Utc>,
    pub performed_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub status: TaskStatus,
    pub maintenance_type: Option<String>,
    pub technician: Option<String>,
    pub cost: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a maintenance task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaintenanceLog {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub maintenance_type: Option<String>,
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub performed_date: Option<DateTime<Utc>>,
}

/// Partial update; only fields that are set are applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceLogUpdate {
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub performed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub maintenance_type: Option<String>,
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// A single reading reported by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: u64,
    pub node_id: String,
    pub pressure: Option<f64>,
    pub flow_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSensorReading {
    pub node_id: String,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub flow_rate: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PressureDrop,
    FlowAnomaly,
    PressureAnomaly,
    SensorOffline,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PressureDrop => "pressure_drop",
            AlertType::FlowAnomaly => "flow_anomaly",
            AlertType::PressureAnomaly => "pressure_anomaly",
            AlertType::SensorOffline => "sensor_offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Leak or anomaly alert raised against a pipe or node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakAlert {
    pub id: u64,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLeakAlert {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub alert_type: AlertType,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub detected_at: Option<DateTime<Utc>>,
}
