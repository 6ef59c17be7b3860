//! HTTP API: network views, CRUD, predictions, health and Prometheus metrics

use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use flow_core::{
    anomaly::{AnomalyMonitor, LeakRiskAssessment, LeakRiskAssessor},
    health::{HealthRegistry, HealthStatus},
    models::{
        ComponentPrediction, ComponentRecord, EntityType, LeakAlert, MaintenanceLog,
        MaintenanceLogUpdate, NewMaintenanceLog, NewSensorReading, Node, Pipe, PredictionResult,
        PredictionSource, SensorReading,
    },
    network::{build_graph, system_stats, GraphData, NetworkRepository, SystemStats},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::MaintenancePredictor,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

const DEFAULT_READINGS_LIMIT: usize = 100;
const MAX_READINGS_LIMIT: usize = 1000;

/// Shared application state
pub struct AppState {
    pub repo: Arc<dyn NetworkRepository>,
    pub predictor: Arc<MaintenancePredictor>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub monitor: AnomalyMonitor,
    pub leak_risk: LeakRiskAssessor,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn NetworkRepository>,
        predictor: Arc<MaintenancePredictor>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            repo,
            predictor,
            health_registry,
            metrics,
            logger,
            monitor: AnomalyMonitor::default(),
            leak_risk: LeakRiskAssessor::new(),
        }
    }

    /// Run the predictor and record metrics and the prediction event
    fn predict(&self, record: &ComponentRecord) -> PredictionResult {
        let start = Instant::now();
        let result = self.predictor.predict(record);
        self.metrics
            .observe_prediction(&result, start.elapsed().as_secs_f64());

        if self.predictor.has_model() && result.source == PredictionSource::RuleBased {
            self.metrics.inc_inference_fallbacks(1);
        }

        self.logger.log_prediction(
            record.id(),
            record.kind(),
            &result,
            self.predictor.model_version(),
        );
        result
    }

    fn predict_component(&self, record: ComponentRecord) -> ComponentPrediction {
        let prediction = self.predict(&record);
        ComponentPrediction {
            component_id: record.id().to_string(),
            component_type: record.kind(),
            risk_if_delayed: record.status().delay_risk(),
            prediction,
        }
    }

    fn record_alerts(&self, alerts: &[LeakAlert]) {
        for alert in alerts {
            let alert_type = alert.alert_type.as_str();
            self.metrics
                .inc_alerts_raised(alert_type, alert.severity.as_str());
            self.logger.log_alert(
                &alert.entity_id,
                alert_type,
                alert.severity.as_str(),
                alert.description.as_deref().unwrap_or_default(),
            );
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Flow-Sentinel API is running" }))
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn graph(State(state): State<Arc<AppState>>) -> ApiResult<Json<GraphData>> {
    let nodes = state.repo.list_nodes().await?;
    let pipes = state.repo.list_pipes().await?;
    Ok(Json(build_graph(&nodes, &pipes)))
}

async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<SystemStats>> {
    let nodes = state.repo.list_nodes().await?;
    let pipes = state.repo.list_pipes().await?;
    Ok(Json(system_stats(&nodes, &pipes)))
}

async fn list_pipes(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Pipe>>> {
    Ok(Json(state.repo.list_pipes().await?))
}

async fn find_pipe(state: &AppState, id: &str) -> ApiResult<Pipe> {
    state
        .repo
        .get_pipe(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pipe", id))
}

async fn find_node(state: &AppState, id: &str) -> ApiResult<Node> {
    state
        .repo
        .get_node(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Node", id))
}

async fn get_pipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Pipe>> {
    Ok(Json(find_pipe(&state, &id).await?))
}

async fn list_nodes(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Node>>> {
    Ok(Json(state.repo.list_nodes().await?))
}

async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Node>> {
    Ok(Json(find_node(&state, &id).await?))
}

async fn pipe_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ComponentPrediction>> {
    let pipe = find_pipe(&state, &id).await?;
    Ok(Json(state.predict_component(pipe.into())))
}

async fn node_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ComponentPrediction>> {
    let node = find_node(&state, &id).await?;
    Ok(Json(state.predict_component(node.into())))
}

async fn predict_maintenance(
    State(state): State<Arc<AppState>>,
    Json(record): Json<ComponentRecord>,
) -> Json<PredictionResult> {
    Json(state.predict(&record))
}

#[derive(Debug, Deserialize)]
struct LeakQuery {
    pipe_id: String,
}

async fn predict_leak(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeakQuery>,
) -> ApiResult<Json<LeakRiskAssessment>> {
    let pipe = find_pipe(&state, &query.pipe_id).await?;
    let source = if pipe.source_node_id.is_empty() {
        None
    } else {
        state.repo.get_node(&pipe.source_node_id).await?
    };

    let assessment = state.leak_risk.assess(&pipe, source.as_ref(), Utc::now());
    info!(
        pipe_id = %assessment.pipe_id,
        leak_probability = assessment.leak_probability,
        risk_level = assessment.risk_level.as_str(),
        "Leak risk assessed"
    );
    Ok(Json(assessment))
}

#[derive(Debug, Deserialize)]
struct MaintenanceQuery {
    entity_type: Option<EntityType>,
    entity_id: Option<String>,
}

/// All tasks, or those of one entity when both filters are given
async fn list_maintenance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MaintenanceQuery>,
) -> ApiResult<Json<Vec<MaintenanceLog>>> {
    let logs = match (query.entity_type, query.entity_id) {
        (None, None) => state.repo.list_maintenance().await?,
        (Some(entity_type), Some(entity_id)) => {
            state
                .repo
                .maintenance_for_entity(entity_type, &entity_id)
                .await?
        }
        _ => {
            return Err(ApiError::BadRequest(
                "entity_type and entity_id must be given together".to_string(),
            ))
        }
    };
    Ok(Json(logs))
}

async fn get_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<MaintenanceLog>> {
    state
        .repo
        .get_maintenance(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Maintenance task", id))
}

async fn create_maintenance(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewMaintenanceLog>,
) -> ApiResult<(StatusCode, Json<MaintenanceLog>)> {
    if new.entity_id.trim().is_empty() {
        return Err(ApiError::BadRequest("entity_id must not be empty".to_string()));
    }
    if matches!(new.cost, Some(cost) if cost < 0.0) {
        return Err(ApiError::BadRequest("cost must not be negative".to_string()));
    }

    let log = state.repo.create_maintenance(new).await?;
    info!(task_id = log.id, entity_id = %log.entity_id, "Maintenance task created");
    Ok((StatusCode::CREATED, Json(log)))
}

async fn update_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(update): Json<MaintenanceLogUpdate>,
) -> ApiResult<Json<MaintenanceLog>> {
    state
        .repo
        .update_maintenance(id, update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Maintenance task", id))
}

async fn delete_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    if !state.repo.delete_maintenance(id).await? {
        return Err(ApiError::not_found("Maintenance task", id));
    }
    info!(task_id = id, "Maintenance task deleted");
    Ok(Json(json!({ "message": "Maintenance task deleted successfully" })))
}

async fn active_alerts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<LeakAlert>>> {
    Ok(Json(state.repo.active_alerts().await?))
}

async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<LeakAlert>> {
    let alert = state
        .repo
        .resolve_alert(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Alert", id))?;
    info!(alert_id = id, entity_id = %alert.entity_id, "Alert resolved");
    Ok(Json(alert))
}

#[derive(Debug, Deserialize)]
struct ReadingsQuery {
    limit: Option<usize>,
}

async fn node_readings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ReadingsQuery>,
) -> ApiResult<Json<Vec<SensorReading>>> {
    let limit = query.limit.unwrap_or(DEFAULT_READINGS_LIMIT);
    if limit == 0 || limit > MAX_READINGS_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_READINGS_LIMIT
        )));
    }

    find_node(&state, &id).await?;
    Ok(Json(state.repo.readings_for_node(&id, limit).await?))
}

/// Stored reading plus any alerts it raised
#[derive(Debug, Serialize)]
pub struct ReadingOutcome {
    pub reading: SensorReading,
    pub alerts: Vec<LeakAlert>,
}

async fn record_reading(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewSensorReading>,
) -> ApiResult<(StatusCode, Json<ReadingOutcome>)> {
    find_node(&state, &new.node_id).await?;

    let reading = state.repo.record_reading(new).await?;
    let alerts = state
        .monitor
        .analyze_reading(state.repo.as_ref(), &reading)
        .await?;
    state.record_alerts(&alerts);

    Ok((StatusCode::CREATED, Json(ReadingOutcome { reading, alerts })))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/graph", get(graph))
        .route("/stats", get(stats))
        .route("/pipes", get(list_pipes))
        .route("/pipes/:id", get(get_pipe))
        .route("/pipes/:id/maintenance-prediction", get(pipe_prediction))
        .route("/nodes", get(list_nodes))
        .route("/nodes/:id", get(get_node))
        .route("/nodes/:id/maintenance-prediction", get(node_prediction))
        .route("/nodes/:id/readings", get(node_readings))
        .route("/predict/maintenance", post(predict_maintenance))
        .route("/predict/leak", post(predict_leak))
        .route("/maintenance", get(list_maintenance).post(create_maintenance))
        .route(
            "/maintenance/:id",
            get(get_maintenance)
                .put(update_maintenance)
                .delete(delete_maintenance),
        )
        .route("/alerts", get(active_alerts))
        .route("/alerts/:id/resolve", post(resolve_alert))
        .route("/readings", post(record_reading))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` completes
pub async fn serve(
    port: u16,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
