//! Prediction error taxonomy
//!
//! None of these reach the caller of [`crate::predictor::MaintenancePredictor::predict`];
//! they select the fallback path and are logged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    /// Model file missing or failed to load. Permanent for the predictor's lifetime.
    #[error("maintenance model unavailable: {0}")]
    ModelUnavailable(String),

    /// Model failed on a single call. Only that call falls back.
    #[error("model inference failed: {0}")]
    ModelInference(String),

    /// Record is missing identifying fields. Defaults still apply.
    #[error("malformed component record: {0}")]
    MalformedInput(String),
}

impl PredictError {
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::ModelUnavailable(_) => "model_unavailable",
            PredictError::ModelInference(_) => "model_inference",
            PredictError::MalformedInput(_) => "malformed_input",
        }
    }
}
