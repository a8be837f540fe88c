use serde::Serialize;

use crate::config::{RemoteLandmarksConfig, ScreeningConfig};
use crate::screening::classifier::classify;
use crate::screening::delegate::RemoteLandmarkClient;
use crate::screening::report::ResultView;
use crate::screening::seed::{extract_seed, ImageSample};
use crate::screening::synthesis::synthesize_landmarks;
use crate::screening::types::{
    ClassificationResult, FacialLandmarks, FeatureBundle, ModelKind, Seed,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LandmarkSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningOutcome {
    pub seed: Seed,
    pub landmark_source: LandmarkSource,
    pub landmarks: FacialLandmarks,
    pub features: FeatureBundle,
    pub result: ClassificationResult,
    pub view: ResultView,
}

/// 图像 → 种子 → 关键点（远程优先，失败回退本地合成）→ 特征 → 分类 → 视图。
#[derive(Debug, Clone)]
pub struct ScreeningPipeline {
    delegate: Option<RemoteLandmarkClient>,
    default_model: ModelKind,
    display_accuracy_pin: Option<u8>,
}

impl ScreeningPipeline {
    pub fn new(screening: &ScreeningConfig, remote: &RemoteLandmarksConfig) -> Self {
        let delegate = remote.enabled.then(|| RemoteLandmarkClient::new(remote));
        Self {
            delegate,
            default_model: screening.default_model,
            display_accuracy_pin: screening.display_accuracy_pin,
        }
    }

    pub fn default_model(&self) -> ModelKind {
        self.default_model
    }

    pub fn display_accuracy_pin(&self) -> Option<u8> {
        self.display_accuracy_pin
    }

    pub fn remote_enabled(&self) -> bool {
        self.delegate.is_some()
    }

    /// 从不失败：解码失败使用回退种子，远程失败使用本地合成。
    pub async fn screen(&self, encoded: &[u8], model: Option<ModelKind>) -> ScreeningOutcome {
        let model = model.unwrap_or(self.default_model);
        let sample = match ImageSample::decode(encoded) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "Image decode failed, using fallback seed");
                None
            }
        };
        let seed = sample.as_ref().map(extract_seed).unwrap_or(Seed::FALLBACK);

        let (landmark_source, landmarks) = match self.remote_landmarks(sample.as_ref(), model).await
        {
            Some(lm) => (LandmarkSource::Remote, lm),
            None => (LandmarkSource::Local, synthesize_landmarks(seed)),
        };

        let features = FeatureBundle::from_landmarks(&landmarks);
        let result = classify(&features, model);
        let view = ResultView::build(&result, &features, self.display_accuracy_pin);

        tracing::info!(
            %seed,
            %model,
            source = ?landmark_source,
            label = %result.label,
            confidence = result.confidence_percent,
            "Screening completed"
        );

        ScreeningOutcome {
            seed,
            landmark_source,
            landmarks,
            features,
            result,
            view,
        }
    }

    async fn remote_landmarks(
        &self,
        sample: Option<&ImageSample>,
        model: ModelKind,
    ) -> Option<FacialLandmarks> {
        let delegate = self.delegate.as_ref()?;
        let sample = sample?;
        let data_url = match sample.to_jpeg_data_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode sample for remote landmarks");
                return None;
            }
        };
        match delegate.fetch_landmarks(&data_url, model).await {
            Ok(lm) => Some(lm),
            Err(e) => {
                tracing::warn!(error = %e, "Remote landmark detection failed, falling back to local synthesis");
                None
            }
        }
    }

    /// 直接对调用方提供的特征向量分类
    pub fn classify_features(
        &self,
        features: &FeatureBundle,
        model: Option<ModelKind>,
    ) -> (ClassificationResult, ResultView) {
        let model = model.unwrap_or(self.default_model);
        let result = classify(features, model);
        let view = ResultView::build(&result, &features.sanitized(), self.display_accuracy_pin);
        (result, view)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;
    use crate::screening::synthesis::synthesize_features;

    fn local_pipeline() -> ScreeningPipeline {
        ScreeningPipeline::new(
            &ScreeningConfig {
                default_model: ModelKind::Enhanced,
                display_accuracy_pin: Some(90),
            },
            &RemoteLandmarksConfig {
                enabled: false,
                base_url: String::new(),
                api_key: String::new(),
                timeout_secs: 1,
            },
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_fn(32, 24, |x, y| {
            Rgba([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8, 255])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn undecodable_image_uses_fallback_seed() {
        let outcome = local_pipeline().screen(b"definitely not an image", None).await;
        assert_eq!(outcome.seed, Seed::FALLBACK);
        assert_eq!(outcome.landmark_source, LandmarkSource::Local);
        assert_eq!(outcome.features, synthesize_features(Seed::FALLBACK));
        assert_eq!(outcome.result.model, ModelKind::Enhanced);
    }

    #[tokio::test]
    async fn same_image_gives_same_outcome() {
        let pipeline = local_pipeline();
        let bytes = png_bytes();
        let a = pipeline.screen(&bytes, Some(ModelKind::Standard)).await;
        let b = pipeline.screen(&bytes, Some(ModelKind::Standard)).await;
        assert_eq!(a.seed, b.seed);
        assert_eq!(a.result, b.result);
        assert_eq!(a.view, b.view);
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_to_local() {
        let pipeline = ScreeningPipeline::new(
            &ScreeningConfig {
                default_model: ModelKind::Ml,
                display_accuracy_pin: None,
            },
            &RemoteLandmarksConfig {
                enabled: true,
                base_url: "http://127.0.0.1:1".to_string(),
                api_key: String::new(),
                timeout_secs: 1,
            },
        );
        assert!(pipeline.remote_enabled());
        let outcome = pipeline.screen(&png_bytes(), None).await;
        assert_eq!(outcome.landmark_source, LandmarkSource::Local);
        assert_eq!(outcome.landmarks, synthesize_landmarks(outcome.seed));
        assert_eq!(outcome.view.accuracy_percent, outcome.result.confidence_percent);
    }

    #[test]
    fn classify_features_uses_default_model() {
        let (result, view) = local_pipeline().classify_features(&FeatureBundle::default(), None);
        assert_eq!(result.model, ModelKind::Enhanced);
        assert_eq!(view.accuracy_percent, 90);
    }
}
