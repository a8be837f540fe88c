//! 关键点服务端点：与远程委托客户端使用同一协议，本进程即可充当远程服务。

use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::routes::screening::parse_model;
use crate::screening::landmark_service::simulate_from_payload;
use crate::screening::FacialLandmarks;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/process_facial_image", post(process_facial_image))
}

#[derive(Debug, Deserialize)]
pub struct LandmarkForm {
    pub image: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
struct LandmarkReply {
    success: bool,
    landmarks: FacialLandmarks,
}

async fn process_facial_image(Form(form): Form<LandmarkForm>) -> Result<impl IntoResponse, AppError> {
    let image = form
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("MISSING_IMAGE", "No image part in the request"))?;
    let model = parse_model(form.model.as_deref())?;

    let landmarks = simulate_from_payload(image);
    tracing::info!(model = ?model, "Facial landmarks simulated");

    Ok(Json(LandmarkReply {
        success: true,
        landmarks,
    }))
}
