use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::monitoring::ExplicitProbabilities;
use crate::response::{ok, AppError};
use crate::screening::seed::decode_payload;
use crate::screening::{ClassificationResult, FeatureBundle, ModelKind, ResultView, SampleError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/classify", post(classify_image))
        .route("/features", post(classify_features))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyImageRequest {
    pub image: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyFeaturesRequest {
    pub features: FeatureBundle,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeaturesResponse {
    result: ClassificationResult,
    view: ResultView,
}

pub(crate) fn parse_model(raw: Option<&str>) -> Result<Option<ModelKind>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => Ok(Some(name.parse::<ModelKind>()?)),
    }
}

async fn classify_image(
    State(state): State<AppState>,
    Json(req): Json<ClassifyImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let model = parse_model(req.model.as_deref())?;
    let image = req.image.as_deref().unwrap_or_default();

    // base64 本身损坏与图像解码失败同等对待：走回退种子
    let bytes = match decode_payload(image) {
        Ok(bytes) => bytes,
        Err(SampleError::Empty) => return Err(SampleError::Empty.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Image payload is not valid base64");
            Vec::new()
        }
    };

    let limit = state.config().max_image_bytes;
    if bytes.len() > limit {
        return Err(AppError::payload_too_large(&format!(
            "image is {} bytes, limit is {limit}",
            bytes.len()
        )));
    }

    let outcome = state.pipeline().screen(&bytes, model).await;
    state
        .monitor()
        .update_prediction(
            outcome.result.label.display_name(),
            Some(ExplicitProbabilities::from(outcome.result.probabilities)),
        )
        .await;

    Ok(ok(outcome))
}

async fn classify_features(
    State(state): State<AppState>,
    Json(req): Json<ClassifyFeaturesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let model = parse_model(req.model.as_deref())?;
    let (result, view) = state.pipeline().classify_features(&req.features, model);
    state
        .monitor()
        .update_prediction(
            result.label.display_name(),
            Some(ExplicitProbabilities::from(result.probabilities)),
        )
        .await;

    Ok(ok(FeaturesResponse { result, view }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_model_accepts_blank_as_default() {
        assert_eq!(parse_model(None).unwrap(), None);
        assert_eq!(parse_model(Some("  ")).unwrap(), None);
        assert_eq!(parse_model(Some("ml")).unwrap(), Some(ModelKind::Ml));
    }

    #[test]
    fn parse_model_rejects_unknown() {
        let err = parse_model(Some("turbo")).unwrap_err();
        assert_eq!(err.code, "INVALID_MODEL");
    }
}
