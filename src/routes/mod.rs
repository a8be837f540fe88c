pub mod health;
pub mod landmarks;
pub mod monitoring;
pub mod screening;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::middleware::request_id;
use crate::response::AppError;
use crate::state::AppState;

/// 额外预留给 JSON 外壳与 data URL 前缀的空间。
const ENVELOPE_SLACK: usize = 64 * 1024;

/// base64 编码后的请求体上限。
fn body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes
        .saturating_mul(4)
        .div_ceil(3)
        .saturating_add(ENVELOPE_SLACK)
}

pub fn build_router(state: AppState) -> Router {
    let limit = body_limit(state.config().max_image_bytes);

    let api_routes = Router::new()
        .nest("/screening", screening::router())
        .nest("/monitoring", monitoring::router());

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .merge(landmarks::router())
        .fallback(fallback_404)
        .layer(DefaultBodyLimit::max(limit))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn fallback_404() -> AppError {
    AppError::not_found("Not found")
}
