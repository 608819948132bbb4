use axum::{Json, extract::State};
use std::collections::BTreeMap;

use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::models::{HealthResponse, InfoResponse};
use crate::api::result::Envelope;
use crate::api::state::AppState;
use crate::api::utils::in_docker;
use crate::engine::{DownloaderStoreConfig, Status, TaskFilter};

/// GET /api/v1/info
pub async fn info(State(state): State<AppState>) -> Envelope<InfoResponse> {
    let tasks = state.engine.get_tasks(&TaskFilter::default()).await;

    let mut status_counts: BTreeMap<String, usize> = Status::KNOWN
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for task in &tasks {
        *status_counts.entry(task.status.to_string()).or_insert(0) += 1;
    }

    Envelope::ok(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        runtime: "rust".to_string(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        in_docker: in_docker(),
        status_counts,
        total_tasks: tasks.len(),
        metrics: state.metrics.snapshot(),
    })
}

/// GET /api/v1/config
pub async fn get_config(
    State(state): State<AppState>,
) -> Result<Envelope<DownloaderStoreConfig>, ApiError> {
    let config = state.engine.get_config().await?;
    Ok(Envelope::ok(config))
}

/// PUT /api/v1/config
pub async fn put_config(
    State(state): State<AppState>,
    ApiJson(config): ApiJson<DownloaderStoreConfig>,
) -> Result<Envelope<()>, ApiError> {
    state.engine.put_config(config).await?;
    Ok(Envelope::nil())
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
