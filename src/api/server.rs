use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use fulltext_index::index::layers;
use fulltext_index::telemetry::SERVICE_NAME;

use crate::state::AppState;

/// GET /api/health - 健康检查
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let layers: Vec<String> = layers(state.index.as_ref())
        .into_iter()
        .map(|l| format!("{:?}", l).to_lowercase())
        .collect();

    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "build_time": env!("BUILD_TIME"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "layers": layers,
        "metrics_port": state.config.metrics.enabled.then_some(state.config.metrics.port),
    }))
}
