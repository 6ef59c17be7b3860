//! Turns detected anomalies into stored leak alerts
//!
//! An anomaly is dropped when the entity already has an unresolved alert of
//! the same type, so a node stuck out of band raises one alert, not one per
//! reading.

use super::{PressureDropDetector, ReadingAnomalyDetector};
use crate::models::{LeakAlert, NewLeakAlert, SensorReading};
use crate::network::NetworkRepository;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Readings fetched for trend analysis
const HISTORY_LIMIT: usize = 64;

#[derive(Default)]
pub struct AnomalyMonitor {
    readings: ReadingAnomalyDetector,
    pressure_drop: PressureDropDetector,
}

impl AnomalyMonitor {
    pub fn new(readings: ReadingAnomalyDetector, pressure_drop: PressureDropDetector) -> Self {
        Self {
            readings,
            pressure_drop,
        }
    }

    /// Check a freshly stored reading against thresholds and the node's recent trend
    pub async fn analyze_reading(
        &self,
        repo: &dyn NetworkRepository,
        reading: &SensorReading,
    ) -> Result<Vec<LeakAlert>> {
        let mut candidates: Vec<NewLeakAlert> = self
            .readings
            .check(reading)
            .iter()
            .map(|a| a.to_alert())
            .collect();

        if reading.pressure.is_some() {
            let history = repo
                .readings_for_node(&reading.node_id, HISTORY_LIMIT)
                .await
                .context("Failed to load reading history")?;
            if let Some(drop) = self.pressure_drop.detect(&history) {
                debug!(
                    node_id = %drop.node_id,
                    slope = drop.slope_bar_per_hour,
                    confidence = drop.confidence,
                    "Pressure drop detected"
                );
                candidates.push(drop.to_alert());
            }
        }

        raise_alerts(repo, candidates).await
    }
}

/// Store each candidate unless an unresolved alert of the same type is already open
pub async fn raise_alerts(
    repo: &dyn NetworkRepository,
    candidates: Vec<NewLeakAlert>,
) -> Result<Vec<LeakAlert>> {
    let mut raised = Vec::new();

    for candidate in candidates {
        let entity_id = candidate.entity_id.clone();
        let alert_type = candidate.alert_type;

        let Some(alert) = repo
            .create_alert_unless_open(candidate)
            .await
            .context("Failed to store alert")?
        else {
            debug!(
                entity_id = %entity_id,
                alert_type = alert_type.as_str(),
                "Alert already open, skipping"
            );
            continue;
        };

        info!(
            alert_id = alert.id,
            entity_id = %alert.entity_id,
            alert_type = alert.alert_type.as_str(),
            severity = alert.severity.as_str(),
            "Alert raised"
        );
        raised.push(alert);
    }

    Ok(raised)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertType, EntityType, NewSensorReading, Severity};
    use crate::network::InMemoryNetworkStore;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn new_reading(pressure: f64, flow: f64, minutes: i64) -> NewSensorReading {
        NewSensorReading {
            node_id: "NODE-003".to_string(),
            pressure: Some(pressure),
            flow_rate: Some(flow),
            temperature: None,
            timestamp: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)),
        }
    }

    #[tokio::test]
    async fn test_threshold_alert_raised_once() {
        let store = InMemoryNetworkStore::new();
        let monitor = AnomalyMonitor::default();

        let first = store.record_reading(new_reading(0.1, 500.0, 0)).await.unwrap();
        let raised = monitor.analyze_reading(&store, &first).await.unwrap();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].alert_type, AlertType::PressureAnomaly);
        assert_eq!(raised[0].severity, Severity::Medium);

        let second = store.record_reading(new_reading(0.2, 500.0, 60)).await.unwrap();
        assert!(monitor.analyze_reading(&store, &second).await.unwrap().is_empty());
        assert_eq!(store.active_alerts().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readings_raise_one_alert() {
        let store = Arc::new(InMemoryNetworkStore::new());
        let monitor = Arc::new(AnomalyMonitor::default());

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let monitor = monitor.clone();
                tokio::spawn(async move {
                    let reading = store.record_reading(new_reading(0.1, 500.0, i)).await.unwrap();
                    monitor.analyze_reading(store.as_ref(), &reading).await.unwrap()
                })
            })
            .collect();

        let mut raised = 0;
        for task in tasks {
            raised += task.await.unwrap().len();
        }

        let open: Vec<_> = store
            .alerts_for_entity(EntityType::Node, "NODE-003")
            .await
            .unwrap()
            .into_iter()
            .filter(|a| !a.is_resolved && a.alert_type == AlertType::PressureAnomaly)
            .collect();
        assert_eq!(raised, 1);
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn test_resolved_alert_does_not_suppress() {
        let store = InMemoryNetworkStore::new();
        let monitor = AnomalyMonitor::default();

        let reading = store.record_reading(new_reading(2.0, 2500.0, 0)).await.unwrap();
        let raised = monitor.analyze_reading(&store, &reading).await.unwrap();
        assert_eq!(raised[0].alert_type, AlertType::FlowAnomaly);
        store.resolve_alert(raised[0].id).await.unwrap();

        let again = monitor.analyze_reading(&store, &reading).await.unwrap();
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn test_pressure_drop_from_history() {
        let store = InMemoryNetworkStore::new();
        let monitor = AnomalyMonitor::default();

        let mut last = None;
        for i in 0..8 {
            let reading = store
                .record_reading(new_reading(2.5 - 0.1 * i as f64, 600.0, 30 * i))
                .await
                .unwrap();
            last = Some(reading);
        }

        let raised = monitor.analyze_reading(&store, &last.unwrap()).await.unwrap();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].alert_type, AlertType::PressureDrop);
        assert_eq!(raised[0].entity_type, EntityType::Node);
    }

    #[tokio::test]
    async fn test_different_types_not_deduplicated() {
        let store = InMemoryNetworkStore::new();
        let candidates = vec![
            NewLeakAlert {
                entity_type: EntityType::Pipe,
                entity_id: "PIPE-001".to_string(),
                alert_type: AlertType::PressureDrop,
                severity: Severity::High,
                description: None,
                detected_at: None,
            },
            NewLeakAlert {
                entity_type: EntityType::Pipe,
                entity_id: "PIPE-001".to_string(),
                alert_type: AlertType::FlowAnomaly,
                severity: Severity::High,
                description: None,
                detected_at: None,
            },
            NewLeakAlert {
                entity_type: EntityType::Pipe,
                entity_id: "PIPE-001".to_string(),
                alert_type: AlertType::PressureDrop,
                severity: Severity::Critical,
                description: None,
                detected_at: None,
            },
        ];
        let raised = raise_alerts(&store, candidates).await.unwrap();
        assert_eq!(raised.len(), 2);
    }
}
