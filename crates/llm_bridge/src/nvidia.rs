//! NVIDIA object-detection client
//!
//! Submits a screenshot to a page-element detection endpoint. The detection
//! payload is provider-defined and is passed through untouched.

use crate::client::{abortable, http_client, optional_env, require_env};
use crate::error::{BridgeError, Provider, Result};
use futures::future::AbortRegistration;
use serde::Serialize;
use serde_json::Value;
use step_core::imaging::to_data_url;
use step_core::DetectionResult;

const API_KEY_VAR: &str = "NVIDIA_API_KEY";
const URL_VAR: &str = "NVIDIA_DETECTION_URL";

/// Configuration for the detection client
#[derive(Debug, Clone)]
pub struct NvidiaConfig {
    pub api_key: String,
    /// Full endpoint URL
    pub url: String,
    /// Timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl NvidiaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: "https://ai.api.nvidia.com/v1/cv/nvidia/nemoretriever-page-elements-v3"
                .to_string(),
            timeout_secs: 120,
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(require_env(Provider::Nvidia, API_KEY_VAR)?);
        if let Some(url) = optional_env(URL_VAR) {
            config.url = url;
        }
        Ok(config)
    }
}

/// Object-detection API client
pub struct NvidiaDetectionClient {
    config: NvidiaConfig,
    client: reqwest::Client,
}

impl NvidiaDetectionClient {
    pub fn new(config: NvidiaConfig) -> Result<Self> {
        let client = http_client(Provider::Nvidia, config.timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(NvidiaConfig::from_env()?)
    }

    /// Detect UI elements on a screenshot (bare base64 or data URL)
    pub async fn detect(
        &self,
        image_base64: &str,
        abort: Option<AbortRegistration>,
    ) -> Result<DetectionResult> {
        if image_base64.trim().is_empty() {
            return Err(BridgeError::MissingInput("imageBase64"));
        }

        let payload = DetectionPayload {
            input: vec![DetectionInput {
                kind: "image_url",
                url: to_data_url(image_base64),
            }],
        };

        tracing::debug!(url = %self.config.url, "calling NVIDIA object detection");
        let body = abortable(Provider::Nvidia, abort, self.send(&payload)).await?;

        Ok(DetectionResult {
            detections: body.clone(),
            raw_response: body,
        })
    }

    async fn send(&self, payload: &DetectionPayload) -> Result<Value> {
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(BridgeError::http(Provider::Nvidia))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BridgeError::Upstream {
                provider: Provider::Nvidia,
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(BridgeError::http(Provider::Nvidia))
    }
}

#[derive(Debug, Serialize)]
struct DetectionPayload {
    input: Vec<DetectionInput>,
}

#[derive(Debug, Serialize)]
struct DetectionInput {
    #[serde(rename = "type")]
    kind: &'static str,
    url: String,
}
