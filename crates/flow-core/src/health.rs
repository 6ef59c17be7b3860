//! Liveness and readiness state for the monitoring service
//!
//! Two subsystems report in: the predictor (model-backed or rule-based) and
//! the network store (seeded contents or a seeding failure). `/healthz`
//! shows the worst of the two, `/readyz` additionally waits for startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, with reduced capability
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_operational(&self) -> bool {
        *self != HealthStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Predictor,
    Store,
}

/// Last report from one subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemHealth {
    pub status: HealthStatus,
    pub message: String,
    /// Loaded model version, predictor only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// (nodes, pipes) held, store only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentCounts>,
    pub reported_at: DateTime<Utc>,
}

impl SubsystemHealth {
    fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            model_version: None,
            components: None,
            reported_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCounts {
    pub nodes: usize,
    pub pipes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub subsystems: BTreeMap<Subsystem, SubsystemHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    subsystems: Arc<RwLock<BTreeMap<Subsystem, SubsystemHealth>>>,
    started: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn report(&self, subsystem: Subsystem, health: SubsystemHealth) {
        self.subsystems.write().await.insert(subsystem, health);
    }

    /// A loaded model is healthy; `None` means rule-based only, which is degraded
    pub async fn report_predictor(&self, model_version: Option<&str>) {
        let health = match model_version {
            Some(version) => SubsystemHealth {
                model_version: Some(version.to_string()),
                ..SubsystemHealth::new(HealthStatus::Healthy, format!("Model {} loaded", version))
            },
            None => SubsystemHealth::new(
                HealthStatus::Degraded,
                "No model loaded, rule-based predictions only",
            ),
        };
        self.report(Subsystem::Predictor, health).await;
    }

    pub async fn report_store(&self, nodes: usize, pipes: usize) {
        let health = SubsystemHealth {
            components: Some(ComponentCounts { nodes, pipes }),
            ..SubsystemHealth::new(
                HealthStatus::Healthy,
                format!("{} nodes and {} pipes tracked", nodes, pipes),
            )
        };
        self.report(Subsystem::Store, health).await;
    }

    pub async fn report_store_failure(&self, error: impl Display) {
        let health = SubsystemHealth::new(HealthStatus::Unhealthy, error.to_string());
        self.report(Subsystem::Store, health).await;
    }

    /// Open the readiness gate once startup has finished
    pub async fn set_ready(&self, ready: bool) {
        *self.started.write().await = ready;
    }

    /// Worst subsystem status; nothing reported yet counts as healthy
    pub async fn health(&self) -> HealthResponse {
        let subsystems = self.subsystems.read().await.clone();
        let status = subsystems
            .values()
            .map(|s| s.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        HealthResponse { status, subsystems }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let started = *self.started.read().await;
        let health = self.health().await;

        let reason = if !started {
            Some("Service not yet initialized".to_string())
        } else {
            health
                .subsystems
                .iter()
                .find(|(_, s)| !s.status.is_operational())
                .map(|(name, s)| format!("{:?} unhealthy: {}", name, s.message))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
