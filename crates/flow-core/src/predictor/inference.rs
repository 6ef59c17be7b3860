//! ONNX regression inference using tract
//!
//! The maintenance regressor takes the 15-column feature vector and returns
//! a single value: days until the next maintenance.

use crate::error::PredictError;
use crate::models::{FeatureVector, FEATURE_COUNT};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

/// Upper bound on model file size accepted by the loader (64MB)
pub const MAX_MODEL_BYTES: u64 = 64 * 1024 * 1024;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A trained model that maps features to a raw day count
pub trait RegressionModel: Send + Sync {
    /// Predict raw days until maintenance. Output is not yet bounded.
    fn predict_days(&self, features: &FeatureVector) -> Result<f64>;

    /// Identifier of the loaded model
    fn version(&self) -> &str;
}

/// Regressor backed by an optimized tract plan
pub struct OnnxRegressor {
    model: TractModel,
    version: String,
}

impl std::fmt::Debug for OnnxRegressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRegressor")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl OnnxRegressor {
    /// Build a regressor from ONNX model bytes
    pub fn from_bytes(model_bytes: &[u8], version: impl Into<String>) -> Result<Self> {
        Ok(Self {
            model: Self::load_model(model_bytes)?,
            version: version.into(),
        })
    }

    /// Parse and optimize an ONNX model with a fixed `[1, 15]` input
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, FEATURE_COUNT]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn features_to_tensor(features: &FeatureVector) -> Result<Tensor> {
        let data = features.to_array().to_vec();
        let array = tract_ndarray::Array2::from_shape_vec((1, FEATURE_COUNT), data)
            .context("Feature vector does not match model input shape")?;
        Ok(array.into())
    }
}

impl RegressionModel for OnnxRegressor {
    fn predict_days(&self, features: &FeatureVector) -> Result<f64> {
        let start = Instant::now();

        let input = Self::features_to_tensor(features)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let values = output.to_array_view::<f32>()?;
        let days = values.iter().next().copied().context("Model output is empty")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        if !days.is_finite() {
            anyhow::bail!("Model produced non-finite output {}", days);
        }
        Ok(days as f64)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Loads the regressor from disk exactly once at startup
#[derive(Debug, Clone)]
pub struct ModelLoader {
    path: PathBuf,
    expected_sha256: Option<String>,
}

impl ModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected_sha256: None,
        }
    }

    /// Require the model file to match a hex-encoded SHA-256 digest
    pub fn with_checksum(mut self, sha256_hex: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256_hex.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and verify the model
    pub fn load(&self) -> std::result::Result<OnnxRegressor, PredictError> {
        self.try_load()
            .map_err(|e| PredictError::ModelUnavailable(format!("{:#}", e)))
    }

    fn try_load(&self) -> Result<OnnxRegressor> {
        let bytes = self.read_model_file()?;
        let checksum = hex::encode(Sha256::digest(&bytes));

        if let Some(expected) = &self.expected_sha256 {
            if !checksum.eq_ignore_ascii_case(expected.trim()) {
                anyhow::bail!(
                    "Checksum mismatch for {:?}: expected {}, got {}",
                    self.path,
                    expected,
                    checksum
                );
            }
        }

        let version = model_version(&self.path, &checksum);
        let regressor = OnnxRegressor::from_bytes(&bytes, version)?;
        debug!(path = ?self.path, version = %regressor.version(), "Model plan ready");
        Ok(regressor)
    }

    /// Read the whole file; the handle is closed when this returns, on every path
    fn read_model_file(&self) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("Model file not found at {:?}", self.path))?;

        let size = file
            .metadata()
            .with_context(|| format!("Failed to stat model file {:?}", self.path))?
            .len();
        if size > MAX_MODEL_BYTES {
            anyhow::bail!("Model file {:?} is {} bytes, limit is {}", self.path, size, MAX_MODEL_BYTES);
        }

        let mut bytes = Vec::with_capacity(size as usize);
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read model file {:?}", self.path))?;
        Ok(bytes)
    }
}

/// `<file stem>@<first 12 hex chars of sha256>`
fn model_version(path: &Path, checksum: &str) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    format!("{}@{}", stem, &checksum[..checksum.len().min(12)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_model_is_unavailable() {
        let loader = ModelLoader::new("/nonexistent/regressor.onnx");
        let err = loader.load().unwrap_err();
        assert!(matches!(err, PredictError::ModelUnavailable(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_garbage_model_is_unavailable() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not an onnx protobuf").unwrap();

        let err = ModelLoader::new(file.path()).load().unwrap_err();
        assert!(matches!(err, PredictError::ModelUnavailable(_)));
    }

    #[test]
    fn test_checksum_mismatch_rejected_before_parse() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"model bytes").unwrap();

        let err = ModelLoader::new(file.path())
            .with_checksum("00".repeat(32))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_model_version_format() {
        let version = model_version(Path::new("/models/regressor.onnx"), "abcdef0123456789");
        assert_eq!(version, "regressor@abcdef012345");
    }
}
