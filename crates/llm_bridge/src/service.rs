//! Per-profile step services

use crate::client::StepClient;
use crate::error::Result;
use async_trait::async_trait;
use futures::future::AbortRegistration;
use step_core::{Profile, StepOutput, StepParams};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A service answering step calls for one fixed profile
#[async_trait]
pub trait StepService: Send + Sync {
    /// Profile this service stands for
    fn profile(&self) -> Profile;

    /// Run one step with this service's profile
    async fn call_model(&self, params: StepParams) -> Result<StepOutput>;

    /// Append one line to the history
    async fn add_to_history(&self, entry: String);

    async fn clear_history(&self);

    /// Snapshot of the history, oldest first
    async fn history(&self) -> Vec<String>;
}

/// Step service backed by a provider client, with a rolling history
pub struct ProfileService {
    client: Arc<dyn StepClient>,
    profile: Profile,
    default_model: String,
    history: Mutex<Vec<String>>,
}

impl ProfileService {
    /// Create a new service for `profile`
    pub fn new(
        client: Arc<dyn StepClient>,
        profile: Profile,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            profile,
            default_model: default_model.into(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Run one step, cancellable through `abort`
    pub async fn call_model_with_abort(
        &self,
        params: StepParams,
        abort: Option<AbortRegistration>,
    ) -> Result<StepOutput> {
        let model = params
            .model
            .clone()
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| self.default_model.clone());
        let request = params.into_request(self.profile, model);

        tracing::debug!(
            provider = %self.client.provider(),
            profile = %self.profile,
            model = %request.model,
            "calling provider"
        );
        let output = self.client.call_step(&request, abort).await?;

        self.add_to_history(format!(
            "step {}: action={}, confidence={}",
            request.step_index, output.action, output.confidence
        ))
        .await;

        Ok(output)
    }
}

#[async_trait]
impl StepService for ProfileService {
    fn profile(&self) -> Profile {
        self.profile
    }

    async fn call_model(&self, params: StepParams) -> Result<StepOutput> {
        self.call_model_with_abort(params, None).await
    }

    async fn add_to_history(&self, entry: String) {
        self.history.lock().await.push(entry);
    }

    async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    async fn history(&self) -> Vec<String> {
        self.history.lock().await.clone()
    }
}
