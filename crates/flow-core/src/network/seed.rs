//! Reference network used for demos and local development

use super::NetworkRepository;
use crate::models::{
    AlertType, ComponentStatus, EntityType, Material, NewLeakAlert, NewMaintenanceLog,
    NewSensorReading, Node, NodeKind, Pipe, Severity, TaskStatus,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::info;

/// What [`seed_mock_network`] inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub nodes: usize,
    pub pipes: usize,
    pub maintenance_logs: usize,
    pub readings: usize,
    pub alerts: usize,
}

fn date(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

#[allow(clippy::too_many_arguments)]
fn node(
    id: &str,
    name: &str,
    kind: NodeKind,
    pressure: f64,
    max_pressure: f64,
    flow_rate: f64,
    (latitude, longitude): (f64, f64),
    status: ComponentStatus,
) -> Node {
    Node {
        id: id.to_string(),
        name: Some(name.to_string()),
        kind,
        pressure: Some(pressure),
        max_pressure: Some(max_pressure),
        flow_rate: Some(flow_rate),
        latitude: Some(latitude),
        longitude: Some(longitude),
        status,
        installation_date: None,
        last_updated: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn pipe(
    id: &str,
    (source, target): (&str, &str),
    length: f64,
    diameter: f64,
    material: Material,
    (flow_capacity, current_flow): (f64, f64),
    pressure_loss: f64,
    installed: Option<DateTime<Utc>>,
    inspected: Option<DateTime<Utc>>,
    status: ComponentStatus,
) -> Pipe {
    Pipe {
        id: id.to_string(),
        source_node_id: source.to_string(),
        target_node_id: target.to_string(),
        length: Some(length),
        diameter: Some(diameter),
        material: Some(material),
        flow_capacity: Some(flow_capacity),
        current_flow: Some(current_flow),
        pressure_loss: Some(pressure_loss),
        installation_date: installed,
        last_inspection: inspected,
        status,
    }
}

pub fn mock_nodes() -> Vec<Node> {
    use ComponentStatus::*;
    use NodeKind::*;
    vec![
        node("NODE-001", "Main Pump Station", Pump, 3.2, 4.0, 1500.0, (28.6139, 77.2090), Active),
        node("NODE-002", "Distribution Junction A", Junction, 2.8, 3.5, 1200.0, (28.6289, 77.2190), Active),
        node("NODE-003", "Pressure Sensor Alpha", Sensor, 2.1, 3.0, 800.0, (28.6439, 77.2290), Active),
        node("NODE-004", "Control Valve B1", Valve, 1.9, 2.5, 600.0, (28.6589, 77.2390), Demand),
        node("NODE-005", "Emergency Shutoff", Valve, 0.0, 3.0, 0.0, (28.6739, 77.2490), Offline),
        node("NODE-006", "Distribution Point C", Junction, 1.8, 2.5, 400.0, (28.6889, 77.2590), Active),
        node("NODE-007", "Leak Detection Sensor", Sensor, 1.2, 2.0, 200.0, (28.7039, 77.2690), Leak),
    ]
}

pub fn mock_pipes() -> Vec<Pipe> {
    use ComponentStatus::*;
    use Material::*;
    vec![
        pipe("PIPE-001", ("NODE-001", "NODE-002"), 2500.0, 300.0, Steel, (1500.0, 1200.0), 0.4,
            date(2020, 3, 15), date(2024, 1, 10), Operational),
        pipe("PIPE-002", ("NODE-002", "NODE-003"), 1800.0, 250.0, Steel, (1200.0, 800.0), 0.7,
            date(2019, 8, 22), date(2023, 11, 5), Operational),
        pipe("PIPE-003", ("NODE-003", "NODE-004"), 1200.0, 200.0, Pvc, (800.0, 600.0), 0.2,
            date(2021, 6, 10), date(2024, 2, 20), Operational),
        pipe("PIPE-004", ("NODE-002", "NODE-005"), 800.0, 150.0, Steel, (500.0, 0.0), 0.0,
            date(2018, 12, 5), date(2023, 9, 15), Maintenance),
        pipe("PIPE-005", ("NODE-004", "NODE-006"), 1500.0, 180.0, Concrete, (600.0, 400.0), 0.1,
            date(2017, 4, 18), date(2023, 12, 8), Operational),
        pipe("PIPE-006", ("NODE-006", "NODE-007"), 900.0, 120.0, Pvc, (400.0, 200.0), 0.6,
            date(2022, 1, 25), date(2024, 3, 12), Damaged),
    ]
}

fn mock_maintenance() -> Vec<NewMaintenanceLog> {
    #[allow(clippy::too_many_arguments)]
    fn task(
        entity_type: EntityType,
        entity_id: &str,
        scheduled: DateTime<Utc>,
        performed: Option<DateTime<Utc>>,
        notes: &str,
        status: TaskStatus,
        kind: &str,
        tech: &str,
        cost: f64,
    ) -> NewMaintenanceLog {
        NewMaintenanceLog {
            entity_type,
            entity_id: entity_id.to_string(),
            scheduled_date: scheduled,
            performed_date: performed,
            notes: Some(notes.to_string()),
            status: Some(status),
            maintenance_type: Some(kind.to_string()),
            technician: Some(tech.to_string()),
            cost: Some(cost),
        }
    }

    let at = |y: i32, m: u32, d: u32| date(y, m, d).unwrap_or_default();

    vec![
        task(EntityType::Pipe, "PIPE-001", at(2024, 6, 15), None,
            "Routine pressure testing and valve inspection", TaskStatus::Scheduled, "inspection", "John Smith", 1500.0),
        task(EntityType::Pipe, "PIPE-002", at(2024, 5, 20), Some(at(2024, 5, 22)),
            "Replaced corroded section near junction", TaskStatus::Completed, "repair", "Sarah Johnson", 3200.0),
        task(EntityType::Node, "NODE-001", at(2024, 7, 1), None,
            "Pump motor maintenance and calibration", TaskStatus::Scheduled, "maintenance", "Mike Wilson", 2800.0),
        task(EntityType::Pipe, "PIPE-004", at(2024, 4, 10), Some(at(2024, 4, 12)),
            "Emergency valve replacement due to failure", TaskStatus::Completed, "replacement", "David Brown", 4500.0),
        task(EntityType::Node, "NODE-007", at(2024, 6, 25), None,
            "Leak detection sensor recalibration", TaskStatus::InProgress, "maintenance", "Lisa Davis", 800.0),
    ]
}

/// Hourly readings over the 24 hours before `now`
///
/// Variation is a fixed sinusoid per node so repeated seeds are identical.
pub fn mock_readings(now: DateTime<Utc>) -> Vec<NewSensorReading> {
    const BASELINES: [(&str, f64, f64); 6] = [
        ("NODE-001", 3.2, 1500.0),
        ("NODE-002", 2.8, 1200.0),
        ("NODE-003", 2.1, 800.0),
        ("NODE-004", 1.9, 600.0),
        ("NODE-006", 1.8, 400.0),
        ("NODE-007", 1.2, 200.0),
    ];

    let start = now - Duration::hours(24);
    let mut readings = Vec::with_capacity(BASELINES.len() * 24);

    for (index, (node_id, pressure, flow)) in BASELINES.iter().enumerate() {
        let phase = index as f64;
        for hour in 0..24 {
            let angle = (hour as f64 + phase) * std::f64::consts::PI / 12.0;
            readings.push(NewSensorReading {
                node_id: node_id.to_string(),
                pressure: Some(pressure + 0.2 * angle.sin()),
                flow_rate: Some(flow + 50.0 * angle.cos()),
                temperature: Some(20.0 + 5.0 * (angle / 2.0).sin()),
                timestamp: Some(start + Duration::hours(hour)),
            });
        }
    }
    readings
}

fn mock_alerts(now: DateTime<Utc>) -> Vec<NewLeakAlert> {
    vec![
        NewLeakAlert {
            entity_type: EntityType::Pipe,
            entity_id: "PIPE-006".to_string(),
            alert_type: AlertType::PressureDrop,
            severity: Severity::High,
            description: Some(
                "Significant pressure drop detected in PIPE-006, possible leak near NODE-007".to_string(),
            ),
            detected_at: Some(now - Duration::hours(2)),
        },
        NewLeakAlert {
            entity_type: EntityType::Node,
            entity_id: "NODE-005".to_string(),
            alert_type: AlertType::SensorOffline,
            severity: Severity::Medium,
            description: Some("NODE-005 has been offline for extended period".to_string()),
            detected_at: Some(now - Duration::hours(6)),
        },
        NewLeakAlert {
            entity_type: EntityType::Pipe,
            entity_id: "PIPE-002".to_string(),
            alert_type: AlertType::FlowAnomaly,
            severity: Severity::Low,
            description: Some("Minor flow irregularity detected, monitoring situation".to_string()),
            detected_at: Some(now - Duration::days(1)),
        },
    ]
}

/// Populate `repo` with the reference network
///
/// The last alert is stored already resolved.
pub async fn seed_mock_network(repo: &dyn NetworkRepository, now: DateTime<Utc>) -> Result<SeedSummary> {
    let nodes = mock_nodes();
    let pipes = mock_pipes();
    let maintenance = mock_maintenance();
    let readings = mock_readings(now);
    let alerts = mock_alerts(now);

    let summary = SeedSummary {
        nodes: nodes.len(),
        pipes: pipes.len(),
        maintenance_logs: maintenance.len(),
        readings: readings.len(),
        alerts: alerts.len(),
    };

    for node in nodes {
        repo.upsert_node(node).await.context("Failed to seed node")?;
    }
    for pipe in pipes {
        repo.upsert_pipe(pipe).await.context("Failed to seed pipe")?;
    }
    for task in maintenance {
        repo.create_maintenance(task).await.context("Failed to seed maintenance log")?;
    }
    for reading in readings {
        repo.record_reading(reading).await.context("Failed to seed sensor reading")?;
    }

    let mut last_alert = None;
    for alert in alerts {
        last_alert = Some(repo.create_alert(alert).await.context("Failed to seed alert")?);
    }
    if let Some(alert) = last_alert {
        repo.resolve_alert(alert.id).await.context("Failed to resolve seeded alert")?;
    }

    info!(
        nodes = summary.nodes,
        pipes = summary.pipes,
        maintenance_logs = summary.maintenance_logs,
        readings = summary.readings,
        alerts = summary.alerts,
        "Mock network seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::InMemoryNetworkStore;

    #[tokio::test]
    async fn test_seed_counts() {
        let store = InMemoryNetworkStore::new();
        let summary = seed_mock_network(&store, Utc::now()).await.unwrap();

        assert_eq!(summary.nodes, 7);
        assert_eq!(summary.pipes, 6);
        assert_eq!(summary.maintenance_logs, 5);
        assert_eq!(summary.readings, 6 * 24);
        assert_eq!(summary.alerts, 3);

        assert_eq!(store.list_nodes().await.unwrap().len(), 7);
        assert_eq!(store.list_pipes().await.unwrap().len(), 6);
        assert_eq!(store.active_alerts().await.unwrap().len(), 2);
        assert_eq!(store.readings_for_node("NODE-001", 100).await.unwrap().len(), 24);
        assert!(store.readings_for_node("NODE-005", 100).await.unwrap().is_empty());
    }

    #[test]
    fn test_readings_are_deterministic() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let first = mock_readings(now);
        let second = mock_readings(now);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.pressure, b.pressure);
            assert_eq!(a.flow_rate, b.flow_rate);
            assert_eq!(a.timestamp, b.timestamp);
        }
    }

    #[test]
    fn test_readings_stay_within_normal_bands() {
        let readings = mock_readings(Utc::now());
        for r in readings {
            let pressure = r.pressure.unwrap();
            let flow = r.flow_rate.unwrap();
            assert!((0.5..=4.0).contains(&pressure), "{} pressure {}", r.node_id, pressure);
            assert!((0.0..=2000.0).contains(&flow), "{} flow {}", r.node_id, flow);
        }
    }

    #[test]
    fn test_pipes_reference_seeded_nodes() {
        let ids: Vec<String> = mock_nodes().into_iter().map(|n| n.id).collect();
        for pipe in mock_pipes() {
            assert!(ids.contains(&pipe.source_node_id));
            assert!(ids.contains(&pipe.target_node_id));
        }
    }
}
