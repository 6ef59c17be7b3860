//! Flow Sentinel - pipeline network monitoring service
//!
//! Serves the network graph, statistics, maintenance records, leak alerts
//! and maintenance predictions over HTTP.

use anyhow::{Context, Result};
use chrono::Utc;
use flow_core::{
    health::HealthRegistry,
    network::{seed_mock_network, InMemoryNetworkStore, NetworkRepository},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::{MaintenancePredictor, ModelLoader},
};
use flow_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "flow-sentinel";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load()?;

    // Initialize tracing with env filter, JSON unless pretty output was asked for
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.pretty_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    }

    info!(port = config.port, seed_mock_data = config.seed_mock_data, "Starting flow-sentinel");

    let logger = StructuredLogger::new(SERVICE_NAME);
    let metrics = ServiceMetrics::new();

    let health_registry = HealthRegistry::new();

    // Load the model once; failures leave the predictor rule-based
    let predictor = match &config.model_path {
        Some(path) => {
            let mut loader = ModelLoader::new(path);
            if let Some(sha256) = &config.model_sha256 {
                loader = loader.with_checksum(sha256);
            }
            let predictor = MaintenancePredictor::from_loader(&loader);
            if predictor.has_model() {
                logger.log_model_loaded(path, predictor.model_version());
            } else {
                logger.log_model_unavailable(path);
            }
            predictor
        }
        None => MaintenancePredictor::rule_based(),
    };

    health_registry
        .report_predictor(predictor.has_model().then(|| predictor.model_version()))
        .await;
    metrics.set_model_state(predictor.has_model(), predictor.model_version());

    let store = Arc::new(InMemoryNetworkStore::new());
    if config.seed_mock_data && store.is_empty().await? {
        match seed_mock_network(store.as_ref(), Utc::now()).await {
            Ok(summary) => info!(?summary, "Loaded reference network"),
            Err(e) => {
                health_registry
                    .report_store_failure(format!("Seeding failed: {:#}", e))
                    .await;
                return Err(e).context("Failed to seed reference network");
            }
        }
    }
    let (nodes, pipes) = store.component_counts();
    metrics.set_components_tracked(nodes, pipes);
    health_registry.report_store(nodes, pipes).await;

    logger.log_startup(SERVICE_VERSION, predictor.model_version());

    let state = Arc::new(api::AppState::new(
        store,
        Arc::new(predictor),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));
    let router = api::create_router(state, &config.cors_origins);

    health_registry.set_ready(true).await;

    api::serve(config.port, router, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
        }
    })
    .await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
