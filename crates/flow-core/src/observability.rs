//! Observability infrastructure for the monitoring service
//!
//! Provides:
//! - Prometheus metrics (prediction latency and source, fallbacks, alerts, model state)
//! - Structured event logging with tracing

use crate::models::{ComponentKind, PredictionResult};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, register_int_gauge_vec, GaugeVec, Histogram, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    inference_fallbacks: IntCounter,
    alerts_raised: IntCounterVec,
    model_loaded: IntGauge,
    model_version_info: GaugeVec,
    components_tracked: IntGaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "flow_sentinel_prediction_latency_seconds",
                "Time spent producing a maintenance prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "flow_sentinel_predictions_total",
                "Maintenance predictions served, by source",
                &["source"]
            )
            .expect("Failed to register predictions_total"),

            inference_fallbacks: register_int_counter!(
                "flow_sentinel_inference_fallbacks_total",
                "Predictions that fell back to rules after a model failure"
            )
            .expect("Failed to register inference_fallbacks_total"),

            alerts_raised: register_int_counter_vec!(
                "flow_sentinel_alerts_raised_total",
                "Leak alerts raised by anomaly detection",
                &["alert_type", "severity"]
            )
            .expect("Failed to register alerts_raised_total"),

            model_loaded: register_int_gauge!(
                "flow_sentinel_model_loaded",
                "1 when a regression model is loaded, 0 when rule-based only"
            )
            .expect("Failed to register model_loaded"),

            model_version_info: register_gauge_vec!(
                "flow_sentinel_model_version_info",
                "Information about the maintenance model in use",
                &["version"]
            )
            .expect("Failed to register model_version_info"),

            components_tracked: register_int_gauge_vec!(
                "flow_sentinel_components_tracked",
                "Network components in the store",
                &["kind"]
            )
            .expect("Failed to register components_tracked"),
        }
    }
}

/// Lightweight handle to the global metrics; clones share the same metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a handle, registering the metrics on first call
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction(&self, result: &PredictionResult, duration_secs: f64) {
        let inner = self.inner();
        inner.prediction_latency_seconds.observe(duration_secs);
        inner
            .predictions_total
            .with_label_values(&[result.source.as_str()])
            .inc();
    }

    /// Record `count` new inference failures
    pub fn inc_inference_fallbacks(&self, count: u64) {
        self.inner().inference_fallbacks.inc_by(count);
    }

    pub fn inc_alerts_raised(&self, alert_type: &str, severity: &str) {
        self.inner()
            .alerts_raised
            .with_label_values(&[alert_type, severity])
            .inc();
    }

    pub fn set_model_state(&self, loaded: bool, version: &str) {
        let inner = self.inner();
        inner.model_loaded.set(loaded as i64);
        inner.model_version_info.reset();
        inner.model_version_info.with_label_values(&[version]).set(1.0);
    }

    pub fn set_components_tracked(&self, nodes: usize, pipes: usize) {
        let inner = self.inner();
        inner.components_tracked.with_label_values(&["node"]).set(nodes as i64);
        inner.components_tracked.with_label_values(&["pipe"]).set(pipes as i64);
    }
}

/// Structured logger for service events
///
/// Every record carries an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_prediction(
        &self,
        component_id: &str,
        component_type: ComponentKind,
        result: &PredictionResult,
        model_version: &str,
    ) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            component_id = %component_id,
            component_type = %component_type,
            days_until_maintenance = result.days_until_maintenance,
            priority = ?result.priority,
            confidence = result.confidence,
            source = result.source.as_str(),
            model_version = %model_version,
            "Generated maintenance prediction"
        );
    }

    pub fn log_model_loaded(&self, path: &str, version: &str) {
        info!(
            event = "model_loaded",
            service = %self.service,
            path = %path,
            model_version = %version,
            "Maintenance model loaded"
        );
    }

    pub fn log_model_unavailable(&self, path: &str) {
        warn!(
            event = "model_unavailable",
            service = %self.service,
            path = %path,
            "Maintenance model unavailable, serving rule-based predictions"
        );
    }

    pub fn log_alert(&self, entity_id: &str, alert_type: &str, severity: &str, details: &str) {
        match severity {
            "critical" | "high" => {
                warn!(
                    event = "alert_raised",
                    service = %self.service,
                    entity_id = %entity_id,
                    alert_type = %alert_type,
                    severity = %severity,
                    details = %details,
                    "Leak alert raised"
                );
            }
            _ => {
                info!(
                    event = "alert_raised",
                    service = %self.service,
                    entity_id = %entity_id,
                    alert_type = %alert_type,
                    severity = %severity,
                    details = %details,
                    "Alert raised"
                );
            }
        }
    }

    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            model_version = %model_version,
            "Flow sentinel started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Flow sentinel shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MaintenanceType, PredictionSource, Priority};
    use chrono::Utc;

    fn result() -> PredictionResult {
        PredictionResult {
            next_maintenance_date: Utc::now(),
            days_until_maintenance: 120,
            priority: Priority::Low,
            confidence: 0.9,
            source: PredictionSource::RuleBased,
            maintenance_type: MaintenanceType::Inspection,
            estimated_cost: 1000.0,
            contributing_factors: vec!["Normal operating conditions".to_string()],
        }
    }

    #[test]
    fn test_service_metrics_recording() {
        let metrics = ServiceMetrics::new();
        let other = ServiceMetrics::new();

        metrics.observe_prediction(&result(), 0.0002);
        other.inc_inference_fallbacks(2);
        metrics.inc_alerts_raised("pressure_drop", "high");
        metrics.set_model_state(false, "rule_based");
        metrics.set_components_tracked(7, 6);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "flow_sentinel_predictions_total"));
        assert!(families
            .iter()
            .any(|f| f.get_name() == "flow_sentinel_components_tracked"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("flow-sentinel");
        assert_eq!(logger.service, "flow-sentinel");
        logger.log_prediction("PIPE-001", ComponentKind::Pipe, &result(), "rule_based");
    }
}
