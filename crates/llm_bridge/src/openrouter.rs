//! OpenRouter chat-completion gateway client

use crate::client::{
    abortable, build_user_text, http_client, optional_env, require_env, StepClient,
    MAX_OUTPUT_TOKENS, TEMPERATURE,
};
use crate::error::{BridgeError, Provider, Result};
use async_trait::async_trait;
use futures::future::AbortRegistration;
use serde::Serialize;
use serde_json::{json, Value};
use step_core::imaging::to_data_url;
use step_core::{StepOutput, StepRequest};

const API_KEY_VAR: &str = "OPEN_ROUTER_API_KEY";
const BASE_URL_VAR: &str = "OPEN_ROUTER_BASE_URL";

/// Configuration for the OpenRouter client
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    /// Base URL of the API (default: https://openrouter.ai/api/v1)
    pub base_url: String,
    /// Timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            timeout_secs: 120,
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(require_env(Provider::OpenRouter, API_KEY_VAR)?);
        if let Some(base_url) = optional_env(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

/// OpenRouter API client
pub struct OpenRouterClient {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = http_client(Provider::OpenRouter, config.timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenRouterConfig::from_env()?)
    }

    /// Send a chat request and return the raw response body
    pub async fn chat(&self, request: &ChatRequest) -> Result<Value> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(BridgeError::http(Provider::OpenRouter))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BridgeError::Upstream {
                provider: Provider::OpenRouter,
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(BridgeError::http(Provider::OpenRouter))?;

        // The gateway reports some failures inside a 200 response.
        if let Some(error) = body.get("error").filter(|e| e.is_object()) {
            let status = error
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .unwrap_or(status.as_u16());
            let detail = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(BridgeError::Upstream {
                provider: Provider::OpenRouter,
                status,
                detail,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl StepClient for OpenRouterClient {
    fn provider(&self) -> Provider {
        Provider::OpenRouter
    }

    async fn call_step(
        &self,
        request: &StepRequest,
        abort: Option<AbortRegistration>,
    ) -> Result<StepOutput> {
        tracing::debug!(model = %request.model, profile = %request.profile, "calling OpenRouter");

        let chat_request = ChatRequest::for_step(request);
        let body = abortable(Provider::OpenRouter, abort, self.chat(&chat_request)).await?;

        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or("{}")
            .to_string();

        Ok(StepOutput::from_content(&content, body))
    }
}

/// Chat-completion request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Assemble the system and user messages for a step
    pub fn for_step(request: &StepRequest) -> Self {
        let mut content = vec![ContentPart::Text {
            text: build_user_text(request),
        }];

        if let Some(image) = request.image() {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: to_data_url(image),
                },
            });
        }

        Self {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageContent::Text(request.profile.system_prompt().to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageContent::Parts(content),
                },
            ],
            response_format: ResponseFormat::step_decision(),
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// A role-tagged chat message
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Schema hint for structured output
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

impl ResponseFormat {
    /// Schema of the action/rationale/confidence decision object
    pub fn step_decision() -> Self {
        Self {
            kind: "json_schema".to_string(),
            json_schema: JsonSchemaFormat {
                name: "usability_step_decision".to_string(),
                schema: json!({
                    "type": "object",
                    "properties": {
                        "action": { "type": "string" },
                        "rationale": { "type": "string" },
                        "confidence": {
                            "type": "number",
                            "description": "Confidence score between 0 and 100 (percentage)"
                        }
                    },
                    "required": ["action", "rationale", "confidence"]
                }),
                strict: true,
            },
        }
    }
}
