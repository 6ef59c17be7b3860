//! Threshold checks on individual sensor readings

use crate::models::{AlertType, EntityType, NewLeakAlert, SensorReading, Severity};
use chrono::{DateTime, Utc};

/// Acceptable operating band for a single reading
#[derive(Debug, Clone)]
pub struct ReadingThresholds {
    /// bar
    pub min_pressure: f64,
    pub max_pressure: f64,
    /// L/min
    pub min_flow: f64,
    pub max_flow: f64,
}

impl Default for ReadingThresholds {
    fn default() -> Self {
        Self {
            min_pressure: 0.5,
            max_pressure: 4.0,
            min_flow: 0.0,
            max_flow: 2000.0,
        }
    }
}

/// An out-of-band value on one node
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingAnomaly {
    pub node_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub observed_at: DateTime<Utc>,
}

impl ReadingAnomaly {
    pub fn to_alert(&self) -> NewLeakAlert {
        NewLeakAlert {
            entity_type: EntityType::Node,
            entity_id: self.node_id.clone(),
            alert_type: self.alert_type,
            severity: self.severity,
            description: Some(self.description.clone()),
            detected_at: Some(self.observed_at),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadingAnomalyDetector {
    thresholds: ReadingThresholds,
}

impl ReadingAnomalyDetector {
    pub fn new(thresholds: ReadingThresholds) -> Self {
        Self { thresholds }
    }

    /// Pressure and flow checks; missing values are not checked
    pub fn check(&self, reading: &SensorReading) -> Vec<ReadingAnomaly> {
        let t = &self.thresholds;
        let mut anomalies = Vec::new();

        if let Some(pressure) = reading.pressure {
            if pressure < t.min_pressure || pressure > t.max_pressure {
                anomalies.push(ReadingAnomaly {
                    node_id: reading.node_id.clone(),
                    alert_type: AlertType::PressureAnomaly,
                    severity: Severity::Medium,
                    description: format!("Unusual pressure reading: {} bar", pressure),
                    observed_at: reading.timestamp,
                });
            }
        }

        if let Some(flow) = reading.flow_rate {
            if flow < t.min_flow || flow > t.max_flow {
                anomalies.push(ReadingAnomaly {
                    node_id: reading.node_id.clone(),
                    alert_type: AlertType::FlowAnomaly,
                    severity: Severity::High,
                    description: format!("Unusual flow rate: {} L/min", flow),
                    observed_at: reading.timestamp,
                });
            }
        }

        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(pressure: Option<f64>, flow_rate: Option<f64>) -> SensorReading {
        SensorReading {
            id: 1,
            node_id: "NODE-003".to_string(),
            pressure,
            flow_rate,
            temperature: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_normal_reading_is_quiet() {
        let detector = ReadingAnomalyDetector::default();
        assert!(detector.check(&reading(Some(2.5), Some(800.0))).is_empty());
        assert!(detector.check(&reading(None, None)).is_empty());
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let detector = ReadingAnomalyDetector::default();
        assert!(detector.check(&reading(Some(0.5), Some(0.0))).is_empty());
        assert!(detector.check(&reading(Some(4.0), Some(2000.0))).is_empty());
    }

    #[test]
    fn test_pressure_anomaly_is_medium() {
        let detector = ReadingAnomalyDetector::default();
        let anomalies = detector.check(&reading(Some(0.2), Some(500.0)));
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].alert_type, AlertType::PressureAnomaly);
        assert_eq!(anomalies[0].severity, Severity::Medium);
        assert!(anomalies[0].description.contains("0.2 bar"));
    }

    #[test]
    fn test_flow_anomaly_is_high() {
        let detector = ReadingAnomalyDetector::default();
        let anomalies = detector.check(&reading(Some(4.5), Some(-10.0)));
        let kinds: Vec<AlertType> = anomalies.iter().map(|a| a.alert_type).collect();
        assert_eq!(kinds, vec![AlertType::PressureAnomaly, AlertType::FlowAnomaly]);
        assert_eq!(anomalies[1].severity, Severity::High);

        let alert = anomalies[1].to_alert();
        assert_eq!(alert.entity_type, EntityType::Node);
        assert_eq!(alert.entity_id, "NODE-003");
    }

    #[test]
    fn test_custom_thresholds() {
        let detector = ReadingAnomalyDetector::new(ReadingThresholds {
            max_flow: 100.0,
            ..Default::default()
        });
        assert_eq!(detector.check(&reading(None, Some(150.0))).len(), 1);
    }
}
