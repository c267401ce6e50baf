//! Gemini integration for step evaluation
//!
//! Talks to the Generative Language REST API directly. The system prompt goes
//! into `systemInstruction`, the screenshot into an inline data part, and the
//! model is asked for `application/json` output.

use crate::client::{
    abortable, build_user_text, http_client, optional_env, require_env, StepClient,
    MAX_OUTPUT_TOKENS, TEMPERATURE,
};
use crate::error::{BridgeError, Provider, Result};
use async_trait::async_trait;
use futures::future::AbortRegistration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use step_core::catalog::GEMINI_DEFAULT_MODEL;
use step_core::imaging::InlineImage;
use step_core::{StepOutput, StepRequest};

const API_KEY_VAR: &str = "GOOGLE_API_KEY";
const BASE_URL_VAR: &str = "GOOGLE_AI_BASE_URL";

/// Configuration for Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for Google Gemini
    pub api_key: String,
    /// Model used when the requested one is not a Gemini model
    pub model: String,
    /// Base URL (default: https://generativelanguage.googleapis.com/v1beta)
    pub base_url: String,
    /// Timeout in seconds
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }

    /// Create config from environment variable
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(require_env(Provider::Gemini, API_KEY_VAR)?);
        if let Some(base_url) = optional_env(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

/// Gemini API client
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = http_client(Provider::Gemini, config.timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Model actually used for a requested model id.
    ///
    /// Gateway ids such as `qwen/...` mean nothing to this API, so anything
    /// that is not a Gemini model runs on the configured default.
    pub fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.starts_with("gemini") {
            requested
        } else {
            &self.config.model
        }
    }

    /// Call `generateContent` and return the raw response body
    pub async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<Value> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(BridgeError::http(Provider::Gemini))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BridgeError::Upstream {
                provider: Provider::Gemini,
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(BridgeError::http(Provider::Gemini))
    }
}

#[async_trait]
impl StepClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn call_step(
        &self,
        request: &StepRequest,
        abort: Option<AbortRegistration>,
    ) -> Result<StepOutput> {
        let model = self.resolve_model(&request.model);
        tracing::debug!(
            requested = %request.model,
            model,
            profile = %request.profile,
            "calling Google AI"
        );

        let body = GenerateRequest::for_step(request);
        let raw = abortable(Provider::Gemini, abort, self.generate(model, &body)).await?;

        let content = response_text(&raw);
        let output = StepOutput::from_content(&content, raw);
        if model == request.model {
            Ok(output)
        } else {
            Ok(output.with_served_model(model))
        }
    }
}

/// Concatenated text of the first candidate, like the SDK's `response.text()`
fn response_text(raw: &Value) -> String {
    serde_json::from_value::<GenerateResponse>(raw.clone())
        .ok()
        .and_then(|response| response.candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    GeminiPart::Text { text } => Some(text),
                    GeminiPart::InlineData { .. } => None,
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Gemini API request structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    pub fn for_step(request: &StepRequest) -> Self {
        let mut parts = vec![GeminiPart::Text {
            text: build_user_text(request),
        }];

        if let Some(image) = request.image() {
            let InlineImage { mime_type, data } = InlineImage::parse(image);
            parts.push(GeminiPart::InlineData {
                inline_data: InlineData { mime_type, data },
            });
        }

        Self {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: request.profile.system_prompt().to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: String,
}

/// Gemini API response structure
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}
