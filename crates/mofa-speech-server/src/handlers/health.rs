//! Health, model listing and metrics endpoints
//!
//! GET /health     - device, memory and slot status
//! GET /v1/models  - OpenAI model list
//! GET /metrics    - switch statistics and post-unload leak check
//! GET /           - service banner

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use chrono::Utc;
use mofa_speech::monitor::{DeviceInfo, LeakReport, MemorySnapshot, PerformanceStats};
use mofa_speech::types::{CoordinatorStatus, LifecycleState, ModelFamily};
use serde::Serialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GpuInfo {
    pub device_name: String,
    pub total_memory_mb: f64,
    pub used_memory_mb: f64,
    pub free_memory_mb: f64,
    pub utilization_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_type: ModelFamily,
    pub status: LifecycleState,
    pub model_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `unhealthy` when the last transition failed
    pub status: &'static str,
    pub gpu: Option<GpuInfo>,
    pub model: ModelInfo,
}

impl From<&CoordinatorStatus> for ModelInfo {
    fn from(status: &CoordinatorStatus) -> Self {
        Self {
            model_type: status.family,
            status: status.lifecycle,
            model_name: status.model_label.clone(),
        }
    }
}

/// Probe calls may shell out, so they run on the blocking pool.
async fn probe(state: &AppState) -> ApiResult<(DeviceInfo, MemorySnapshot)> {
    let monitor = state.coordinator.monitor().clone();
    tokio::task::spawn_blocking(move || (monitor.device(), monitor.snapshot()))
        .await
        .map_err(|e| ApiError::Internal(format!("memory probe failed: {e}")))
}

/// GET /health
///
/// Reads the coordinator snapshot without waiting on an in-flight switch.
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let status = state.coordinator.current_status();
    let (device, memory) = probe(&state).await?;

    let gpu = device.available.then(|| GpuInfo {
        device_name: device.device_name,
        total_memory_mb: round2(memory.total_mb()),
        used_memory_mb: round2(memory.used_mb()),
        free_memory_mb: round2(memory.free_mb()),
        utilization_percent: round2(memory.utilization_percent()),
    });

    Ok(Json(HealthResponse {
        status: if status.lifecycle == LifecycleState::Failed {
            "unhealthy"
        } else {
            "healthy"
        },
        gpu,
        model: ModelInfo::from(&status),
    }))
}

/// GET /v1/models
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let created = Utc::now().timestamp();
    let data: Vec<_> = [&state.models.stt, &state.models.tts]
        .into_iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "object": "model",
                "created": created,
                "owned_by": "mofa",
            })
        })
        .collect();
    Json(json!({ "object": "list", "data": data }))
}

#[derive(Debug, Serialize)]
struct MemoryReport {
    #[serde(flatten)]
    snapshot: MemorySnapshot,
    total_mb: f64,
    used_mb: f64,
    free_mb: f64,
    utilization_percent: f64,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    timestamp: f64,
    gpu: serde_json::Value,
    model: serde_json::Value,
    performance: PerformanceStats,
    /// Residual check taken after the most recent unload. A live comparison
    /// would count the resident model itself as growth.
    memory_leak_detection: Option<LeakReport>,
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let status = state.coordinator.current_status();
    let (device, memory) = probe(&state).await?;

    let monitor = state.coordinator.monitor();
    let memory = MemoryReport {
        snapshot: memory,
        total_mb: round2(memory.total_mb()),
        used_mb: round2(memory.used_mb()),
        free_mb: round2(memory.free_mb()),
        utilization_percent: round2(memory.utilization_percent()),
    };

    Ok(Json(MetricsResponse {
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        gpu: json!({
            "available": device.available,
            "device_name": device.device_name,
            "backend": device.backend,
            "driver_version": device.driver_version,
            "memory": memory,
        }),
        model: json!({
            "current_type": status.family,
            "current_status": status.lifecycle,
            "current_name": status.model_label,
            "generation": status.generation,
            "last_transition": status.last_transition,
        }),
        performance: monitor.performance_stats(),
        memory_leak_detection: monitor.last_unload_report(),
    }))
}

/// GET /
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "mofa-speech-server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "transcriptions": "/v1/audio/transcriptions",
            "speech": "/v1/audio/speech",
            "health": "/health",
            "models": "/v1/models",
            "metrics": "/metrics",
        },
    }))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build the health router sub-tree
pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/v1/models", get(list_models))
        .route("/metrics", get(metrics))
}
