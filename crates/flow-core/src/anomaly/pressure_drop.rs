//! Sustained pressure drop detection
//!
//! Fits a least-squares line to a node's recent pressure history. A steep,
//! consistently falling trend is a typical leak signature downstream of the
//! node.

use crate::models::{AlertType, EntityType, NewLeakAlert, SensorReading, Severity};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Minimum samples inside the window
const MIN_SAMPLES_FOR_DETECTION: usize = 6;

/// Fraction of steps that must be flat or falling
const MONOTONICITY_THRESHOLD: f64 = 0.8;

pub struct PressureDropDetector {
    /// History considered, counted back from the newest sample (default: 6 hours)
    pub window_size: Duration,
    /// Minimum fall in bar/hour to report
    pub slope_threshold: f64,
}

impl PressureDropDetector {
    pub fn new(window_size: Duration, slope_threshold: f64) -> Self {
        Self {
            window_size,
            slope_threshold,
        }
    }

    /// Detect a pressure drop in `readings` for one node, in any order
    pub fn detect(&self, readings: &[SensorReading]) -> Option<PressureDropAnomaly> {
        let mut samples: Vec<(DateTime<Utc>, f64)> = readings
            .iter()
            .filter_map(|r| r.pressure.map(|p| (r.timestamp, p)))
            .filter(|(_, p)| p.is_finite())
            .collect();
        samples.sort_by_key(|(ts, _)| *ts);

        let window = self.filter_window(&samples);
        if window.len() < MIN_SAMPLES_FOR_DETECTION {
            return None;
        }

        let points: Vec<(f64, f64)> = {
            let t0 = window[0].0;
            window
                .iter()
                .map(|(ts, p)| ((*ts - t0).num_seconds() as f64 / 3600.0, *p))
                .collect()
        };

        let slope = linear_regression_slope(&points);
        if slope >= -self.slope_threshold {
            return None;
        }

        let monotonicity = falling_fraction(&points);
        if monotonicity < MONOTONICITY_THRESHOLD {
            return None;
        }

        let r_squared = r_squared(&points, slope);
        let (_, start_pressure) = window[0];
        let (detected_at, current_pressure) = window[window.len() - 1];

        Some(PressureDropAnomaly {
            node_id: readings.first().map(|r| r.node_id.clone()).unwrap_or_default(),
            slope_bar_per_hour: slope,
            confidence: (r_squared * monotonicity).clamp(0.0, 1.0),
            start_pressure,
            current_pressure,
            samples_analyzed: window.len(),
            detected_at,
        })
    }

    fn filter_window<'a>(&self, samples: &'a [(DateTime<Utc>, f64)]) -> &'a [(DateTime<Utc>, f64)] {
        let Some((latest, _)) = samples.last() else {
            return samples;
        };
        let window = chrono::Duration::from_std(self.window_size)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        let start = *latest - window;
        let first = samples.partition_point(|(ts, _)| *ts < start);
        &samples[first..]
    }
}

impl Default for PressureDropDetector {
    fn default() -> Self {
        Self {
            window_size: Duration::from_secs(6 * 3600),
            slope_threshold: 0.05,
        }
    }
}

/// Least-squares slope of (hours, bar) points
fn linear_regression_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (x, y) in points {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

fn r_squared(points: &[(f64, f64)], slope: f64) -> f64 {
    let n = points.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let intercept = mean_y - slope * mean_x;

    let (mut ss_res, mut ss_tot) = (0.0, 0.0);
    for (x, y) in points {
        ss_res += (y - (slope * x + intercept)).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }

    if ss_tot.abs() < f64::EPSILON {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Fraction of consecutive steps where pressure did not rise
fn falling_fraction(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let falling = points.windows(2).filter(|w| w[1].1 <= w[0].1).count();
    falling as f64 / (points.len() - 1) as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct PressureDropAnomaly {
    pub node_id: String,
    /// Negative for a drop
    pub slope_bar_per_hour: f64,
    /// R² times monotonicity, in [0, 1]
    pub confidence: f64,
    pub start_pressure: f64,
    pub current_pressure: f64,
    pub samples_analyzed: usize,
    pub detected_at: DateTime<Utc>,
}

impl PressureDropAnomaly {
    pub fn severity(&self) -> Severity {
        if self.slope_bar_per_hour <= -0.2 {
            Severity::Critical
        } else {
            Severity::High
        }
    }

    pub fn to_alert(&self) -> NewLeakAlert {
        NewLeakAlert {
            entity_type: EntityType::Node,
            entity_id: self.node_id.clone(),
            alert_type: AlertType::PressureDrop,
            severity: self.severity(),
            description: Some(format!(
                "Pressure falling {:.3} bar/h at {} ({:.2} to {:.2} bar), possible leak",
                -self.slope_bar_per_hour, self.node_id, self.start_pressure, self.current_pressure
            )),
            detected_at: Some(self.detected_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(values: &[f64]) -> Vec<SensorReading> {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, p)| SensorReading {
                id: i as u64,
                node_id: "NODE-007".to_string(),
                pressure: Some(*p),
                flow_rate: None,
                temperature: None,
                timestamp: base + chrono::Duration::minutes(30 * i as i64),
            })
            .collect()
    }

    #[test]
    fn test_flat_pressure_no_drop() {
        let detector = PressureDropDetector::default();
        assert!(detector.detect(&series(&[2.0; 12])).is_none());
    }

    #[test]
    fn test_detect_clear_drop() {
        let detector = PressureDropDetector::default();
        // 0.15 bar every 30 minutes
        let values: Vec<f64> = (0..12).map(|i| 2.5 - 0.15 * i as f64).collect();
        let anomaly = detector.detect(&series(&values)).unwrap();

        assert!((anomaly.slope_bar_per_hour + 0.3).abs() < 1e-9);
        assert!(anomaly.confidence > 0.95);
        assert_eq!(anomaly.samples_analyzed, 12);
        assert_eq!(anomaly.severity(), Severity::Critical);

        let alert = anomaly.to_alert();
        assert_eq!(alert.alert_type, AlertType::PressureDrop);
        assert_eq!(alert.entity_id, "NODE-007");
    }

    #[test]
    fn test_insufficient_samples() {
        let detector = PressureDropDetector::default();
        assert!(detector.detect(&series(&[2.5, 2.2, 1.9, 1.6, 1.3])).is_none());
    }

    #[test]
    fn test_oscillating_pressure_rejected() {
        let detector = PressureDropDetector::default();
        let values: Vec<f64> = (0..12)
            .map(|i| 2.5 - 0.05 * i as f64 + if i % 2 == 0 { 0.3 } else { 0.0 })
            .collect();
        assert!(detector.detect(&series(&values)).is_none());
    }

    #[test]
    fn test_only_recent_window_considered() {
        let detector = PressureDropDetector::new(Duration::from_secs(3 * 3600), 0.05);
        // Old steep drop followed by 3 flat hours
        let mut values: Vec<f64> = (0..10).map(|i| 3.0 - 0.2 * i as f64).collect();
        values.extend([1.0; 7]);
        assert!(detector.detect(&series(&values)).is_none());
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let detector = PressureDropDetector::default();
        let values: Vec<f64> = (0..8).map(|i| 2.0 - 0.05 * i as f64).collect();
        let mut readings = series(&values);
        readings.reverse();
        let anomaly = detector.detect(&readings).unwrap();
        assert_eq!(anomaly.severity(), Severity::High);
        assert!((anomaly.current_pressure - 1.65).abs() < 1e-9);
    }
}
