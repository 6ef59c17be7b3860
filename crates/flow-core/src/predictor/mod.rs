//! Maintenance prediction engine
//!
//! [`MaintenancePredictor`] is built once at startup. It holds the loaded
//! regressor, or nothing, and is shared by reference afterwards. Every call
//! to [`MaintenancePredictor::predict`] returns a result: model failures
//! degrade to the rule-based estimate and are reported through
//! [`PredictionResult::source`].

mod features;
mod inference;
mod output;
mod rules;


pub use features::{
    age_years, days_since_inspection, resolve_material, size_metric, utilization_ratio,
    FeatureDeriver,
};
pub use inference::{ModelLoader, OnnxRegressor, RegressionModel, MAX_MODEL_BYTES};
pub use output::{
    OutputFormatter, MAX_CONFIDENCE, MAX_DAYS, MIN_CONFIDENCE, MIN_DAYS, NORMAL_CONDITIONS,
};
pub use rules::{RuleBasedEstimator, RULE_MIN_DAYS};

use crate::error::PredictError;
use crate::models::{ComponentRecord, FeatureVector, PredictionResult, PredictionSource};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Version string reported when no model is loaded
pub const RULE_BASED_VERSION: &str = "rule_based";

/// Counters for predictions served by this instance
#[derive(Debug, Default)]
pub struct PredictorStats {
    pub model_predictions: AtomicU64,
    pub fallback_predictions: AtomicU64,
    pub inference_failures: AtomicU64,
}

/// Point-in-time copy of [`PredictorStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PredictorStatsSnapshot {
    pub model_predictions: u64,
    pub fallback_predictions: u64,
    pub inference_failures: u64,
}

pub struct MaintenancePredictor {
    model: Option<Box<dyn RegressionModel>>,
    deriver: FeatureDeriver,
    rules: RuleBasedEstimator,
    formatter: OutputFormatter,
    stats: PredictorStats,
}

impl std::fmt::Debug for MaintenancePredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenancePredictor")
            .field("model_version", &self.model_version())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl MaintenancePredictor {
    /// Predictor with no model; every call uses the rule-based path
    pub fn rule_based() -> Self {
        Self {
            model: None,
            deriver: FeatureDeriver::new(),
            rules: RuleBasedEstimator::new(),
            formatter: OutputFormatter::new(),
            stats: PredictorStats::default(),
        }
    }

    pub fn with_model(model: Box<dyn RegressionModel>) -> Self {
        Self {
            model: Some(model),
            ..Self::rule_based()
        }
    }

    /// Load the model once. On failure the predictor stays rule-based for its lifetime.
    pub fn from_loader(loader: &ModelLoader) -> Self {
        match loader.load() {
            Ok(model) => Self::with_model(Box::new(model)),
            Err(e) => {
                warn!(
                    path = ?loader.path(),
                    error = %e,
                    kind = e.kind(),
                    "Maintenance model unavailable, using rule-based predictions"
                );
                Self::rule_based()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_version(&self) -> &str {
        self.model
            .as_ref()
            .map(|m| m.version())
            .unwrap_or(RULE_BASED_VERSION)
    }

    pub fn stats(&self) -> PredictorStatsSnapshot {
        PredictorStatsSnapshot {
            model_predictions: self.stats.model_predictions.load(Ordering::Relaxed),
            fallback_predictions: self.stats.fallback_predictions.load(Ordering::Relaxed),
            inference_failures: self.stats.inference_failures.load(Ordering::Relaxed),
        }
    }

    /// Predict against the current wall clock
    pub fn predict(&self, record: &ComponentRecord) -> PredictionResult {
        self.predict_at(record, Utc::now())
    }

    /// Predict against a fixed clock. Deterministic for a given record and `now`.
    pub fn predict_at(&self, record: &ComponentRecord, now: DateTime<Utc>) -> PredictionResult {
        if record.id().trim().is_empty() {
            let err = PredictError::MalformedInput("component id is empty".to_string());
            warn!(kind = err.kind(), error = %err, "Predicting with defaults");
        }

        let features = self.deriver.derive_at(record, now);
        let (raw_days, source) = match self.model_estimate(record, &features) {
            Some(days) => {
                self.stats.model_predictions.fetch_add(1, Ordering::Relaxed);
                (days, PredictionSource::Model)
            }
            None => {
                self.stats.fallback_predictions.fetch_add(1, Ordering::Relaxed);
                let days = self.rules.estimate(record, age_years(record, now));
                (days, PredictionSource::RuleBased)
            }
        };

        debug!(
            component_id = %record.id(),
            component_type = %record.kind(),
            raw_days,
            source = source.as_str(),
            "Raw maintenance estimate"
        );

        self.formatter.finalize(raw_days, record, &features, source, now)
    }

    /// `None` when there is no model or this call failed
    fn model_estimate(&self, record: &ComponentRecord, features: &FeatureVector) -> Option<f64> {
        let model = self.model.as_ref()?;

        let result = model
            .predict_days(features)
            .map_err(|e| PredictError::ModelInference(format!("{:#}", e)))
            .and_then(|days| {
                if days.is_finite() {
                    Ok(days)
                } else {
                    Err(PredictError::ModelInference(format!("non-finite output {}", days)))
                }
            });

        match result {
            Ok(days) => Some(days),
            Err(e) => {
                self.stats.inference_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    component_id = %record.id(),
                    kind = e.kind(),
                    error = %e,
                    "Inference failed, falling back to rules for this call"
                );
                None
            }
        }
    }
}

impl Default for MaintenancePredictor {
    fn default() -> Self {
        Self::rule_based()
    }
}
