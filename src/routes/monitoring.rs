use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;

use crate::monitoring::ExplicitProbabilities;
use crate::response::{ok, AppError};
use crate::state::AppState;

static STREAM_COUNT: AtomicUsize = AtomicUsize::new(0);

struct StreamGuard;
impl Drop for StreamGuard {
    fn drop(&mut self) {
        STREAM_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/prediction", post(update_prediction))
        .route("/snapshot", get(snapshot))
        .route("/stream", get(stream))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub label: String,
    pub probabilities: Option<ExplicitProbabilities>,
}

async fn start(State(state): State<AppState>) -> impl IntoResponse {
    let started = state.monitor().start().await;
    ok(serde_json::json!({ "running": true, "changed": started }))
}

async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    let stopped = state.monitor().stop().await;
    ok(serde_json::json!({ "running": false, "changed": stopped }))
}

async fn update_prediction(
    State(state): State<AppState>,
    Json(req): Json<PredictionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let label = req.label.trim();
    if label.is_empty() {
        return Err(AppError::bad_request("MISSING_LABEL", "label must not be empty"));
    }
    state
        .monitor()
        .update_prediction(label, req.probabilities)
        .await;
    Ok(ok(state.monitor().snapshot().await))
}

async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.monitor().snapshot().await)
}

/// 按固定间隔推送监测快照，直到客户端断开或服务关闭。
pub async fn stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let max_streams = state.config().monitor.max_streams;
    let current = STREAM_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= max_streams {
        STREAM_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many monitoring streams"));
    }
    // 计数在流被丢弃时归还，即使流从未被轮询
    let guard = StreamGuard;

    let mut shutdown_rx = state.shutdown_rx();
    let period = Duration::from_millis(state.config().monitor.stream_interval_ms.max(1));
    let monitor = state.monitor().clone();

    let stream = async_stream::stream! {
        let _guard = guard;
        let mut interval = tokio::time::interval(period);
        let mut last_ticks: Option<u64> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snap = monitor.snapshot().await;
                    // 定时器停止后状态不再变化，不重复推送
                    if last_ticks == Some(snap.ticks) && !snap.running {
                        continue;
                    }
                    last_ticks = Some(snap.ticks);
                    match serde_json::to_string(&snap) {
                        Ok(json) => yield Ok(Event::default().event("monitor").data(json)),
                        Err(e) => tracing::error!(error = %e, "Failed to serialize monitor snapshot"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
