//! Core library for pipeline network monitoring
//!
//! This crate provides:
//! - The network data model
//! - Maintenance prediction (feature derivation, regression model with rule-based fallback)
//! - Sensor anomaly detection and leak risk scoring
//! - In-memory network storage with graph and statistics views
//! - Health checks and observability

pub mod anomaly;
pub mod error;
pub mod health;
pub mod models;
pub mod network;
pub mod observability;
pub mod predictor;

pub use error::PredictError;
pub use health::{
    HealthRegistry, HealthResponse, HealthStatus, ReadinessResponse, Subsystem, SubsystemHealth,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::MaintenancePredictor;
