use std::time::Duration;

use serde::Deserialize;

use crate::config::RemoteLandmarksConfig;
use crate::screening::types::{FacialLandmarks, ModelKind};

const LANDMARK_PATH: &str = "/process_facial_image";

/// 远程关键点服务客户端。所有错误都由调用方回退到本地合成。
#[derive(Debug, Clone)]
pub struct RemoteLandmarkClient {
    config: RemoteLandmarksConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LandmarkReply {
    landmarks: Option<FacialLandmarks>,
}

impl RemoteLandmarkClient {
    pub fn new(config: &RemoteLandmarksConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: config.clone(),
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), LANDMARK_PATH)
    }

    /// 发送 JPEG data URL，返回远程服务给出的关键点。
    pub async fn fetch_landmarks(
        &self,
        image_data_url: &str,
        model: ModelKind,
    ) -> Result<FacialLandmarks, DelegateError> {
        if !self.config.enabled {
            return Err(DelegateError::Disabled);
        }

        let mut req = self
            .client
            .post(self.endpoint())
            .form(&[("image", image_data_url), ("model", model.as_str())]);
        if !self.config.api_key.is_empty() {
            req = req.bearer_auth(&self.config.api_key);
        }

        let resp = req.send().await.map_err(map_transport)?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DelegateError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let reply: LandmarkReply = resp
            .json()
            .await
            .map_err(|e| DelegateError::Malformed(e.to_string()))?;
        reply
            .landmarks
            .ok_or_else(|| DelegateError::Malformed("response has no landmarks".to_string()))
    }
}

fn map_transport(e: reqwest::Error) -> DelegateError {
    if e.is_timeout() {
        DelegateError::Timeout
    } else {
        DelegateError::Network(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DelegateError {
    #[error("remote landmarks are disabled")]
    Disabled,
    #[error("remote landmark request timed out")]
    Timeout,
    #[error("remote landmark network error: {0}")]
    Network(String),
    #[error("remote landmark api error: status={status}, message={message}")]
    ApiError { status: u16, message: String },
    #[error("remote landmark response malformed: {0}")]
    Malformed(String),
}
