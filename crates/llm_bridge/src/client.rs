//! Provider client abstraction
//!
//! Every chat-style provider adapts its API to [`StepClient::call_step`]:
//! one [`StepRequest`] in, one normalized [`StepOutput`] out.

use crate::error::{BridgeError, Provider, Result};
use crate::gemini::GeminiClient;
use crate::openrouter::OpenRouterClient;
use async_trait::async_trait;
use futures::future::{AbortRegistration, Abortable};
use step_core::{StepOutput, StepRequest};
use std::future::Future;
use std::sync::Arc;

/// Sampling temperature for every step call
pub const TEMPERATURE: f32 = 0.2;

/// Output token ceiling for every step call
pub const MAX_OUTPUT_TOKENS: u32 = 15000;

const DECISION_INSTRUCTIONS: &str = "Answer ONLY with JSON containing the fields:
 - action: string, the user's next concrete action;
 - rationale: string, why this action was chosen;
 - confidence: integer from 0 to 100, your confidence in percent.";

/// A vision model provider that answers step requests
#[async_trait]
pub trait StepClient: Send + Sync {
    /// Provider behind this client
    fn provider(&self) -> Provider;

    /// Run one step request.
    ///
    /// Triggering the abort handle paired with `abort` cancels the in-flight
    /// request and fails the call with [`BridgeError::Cancelled`].
    async fn call_step(
        &self,
        request: &StepRequest,
        abort: Option<AbortRegistration>,
    ) -> Result<StepOutput>;
}

/// Long-lived provider clients, built once at startup.
///
/// A client is `None` when its credentials were missing.
#[derive(Clone, Default)]
pub struct ProviderClients {
    /// Chat-completion gateway
    pub chat: Option<Arc<dyn StepClient>>,
    /// Generative-AI client
    pub vision: Option<Arc<dyn StepClient>>,
}

impl ProviderClients {
    /// Build every client whose credentials are present.
    ///
    /// A client with missing credentials is left out and logged; the
    /// profiles it serves stay unavailable.
    pub fn from_env() -> Self {
        Self {
            chat: enabled(OpenRouterClient::from_env()),
            vision: enabled(GeminiClient::from_env()),
        }
    }
}

fn enabled<C: StepClient + 'static>(client: Result<C>) -> Option<Arc<dyn StepClient>> {
    match client {
        Ok(client) => Some(Arc::new(client) as Arc<dyn StepClient>),
        Err(err) => {
            tracing::warn!(error = %err, "provider disabled");
            None
        }
    }
}

/// Read a required credential from the environment
pub(crate) fn require_env(provider: Provider, var: &'static str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(BridgeError::MissingCredential { provider, var })
}

/// Read an optional override from the environment
pub(crate) fn optional_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.trim().is_empty())
}

/// Build the HTTP client shared by one provider's calls
pub(crate) fn http_client(provider: Provider, timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(BridgeError::http(provider))
}

/// Run `request`, cancelling it when `abort` fires
pub(crate) async fn abortable<F, T>(
    provider: Provider,
    abort: Option<AbortRegistration>,
    request: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match abort {
        Some(registration) => Abortable::new(request, registration)
            .await
            .map_err(|_| BridgeError::Cancelled { provider })?,
        None => request.await,
    }
}

/// Build the user text segment shared by all chat-style providers
pub fn build_user_text(request: &StepRequest) -> String {
    let mut parts = vec![
        format!("User objective: {}", request.objective),
        format!("Current step: {}", request.step_index),
    ];

    if let Some(summary) = request.history_summary.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Summary of previous steps: {}", summary));
    }

    if let Some(ui_json) = request.ui_json.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!(
            "Interface elements as JSON (use them if helpful, no need to repeat them):\n{}",
            ui_json
        ));
    }

    if request.profile.expects_decision() {
        parts.push(DECISION_INSTRUCTIONS.to_string());
    }

    parts.join("\n\n")
}
