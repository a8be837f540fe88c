use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let pipeline = state.pipeline();
    let monitor_running = state.monitor().is_running().await;
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "screening": {
            "defaultModel": pipeline.default_model(),
            "remoteLandmarks": pipeline.remote_enabled(),
        },
        "monitor": {
            "running": monitor_running,
            "tickMs": state.monitor().tick_interval().as_millis() as u64,
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 无外部依赖需要检查；远程关键点服务不可用时会回退本地合成。
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}
