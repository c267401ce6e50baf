//! Fan-out of one step across profiles and models
//!
//! A run computes the cross product of the requested profiles and models,
//! calls the registered [`StepService`] for every pair concurrently and
//! returns the results in cross-product order.

use crate::client::ProviderClients;
use crate::error::{BridgeError, Result};
use crate::service::{ProfileService, StepService};
use futures::future::{join_all, try_join_all};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use step_core::catalog::{ANALYSIS_DEFAULT_MODEL, GUIDE_DEFAULT_MODEL};
use step_core::{PairResult, Profile, StepParams, StepRunRequest, StepRunResponse};

/// Explicit profile to service map, populated at startup
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<Profile, Arc<dyn StepService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard wiring: component analysis on the generative-AI client,
    /// guide and walkthrough on the chat gateway.
    ///
    /// Profiles whose client is missing stay unregistered.
    pub fn standard(clients: &ProviderClients) -> Self {
        let mut registry = Self::new();

        if let Some(vision) = &clients.vision {
            registry.register(Arc::new(ProfileService::new(
                vision.clone(),
                Profile::ComponentAnalysis,
                ANALYSIS_DEFAULT_MODEL,
            )));
        }

        if let Some(chat) = &clients.chat {
            registry.register(Arc::new(ProfileService::new(
                chat.clone(),
                Profile::Guide,
                GUIDE_DEFAULT_MODEL,
            )));
            registry.register(Arc::new(ProfileService::new(
                chat.clone(),
                Profile::CognitiveWalkthrough,
                ANALYSIS_DEFAULT_MODEL,
            )));
        }

        registry
    }

    /// Register a service under its own profile, replacing any previous one
    pub fn register(&mut self, service: Arc<dyn StepService>) -> &mut Self {
        self.services.insert(service.profile(), service);
        self
    }

    pub fn get(&self, profile: Profile) -> Result<Arc<dyn StepService>> {
        self.services
            .get(&profile)
            .cloned()
            .ok_or_else(|| BridgeError::UnregisteredProfile(profile.key().to_string()))
    }

    /// Registered profiles in registry order
    pub fn profiles(&self) -> Vec<Profile> {
        Profile::ALL
            .into_iter()
            .filter(|profile| self.services.contains_key(profile))
            .collect()
    }
}

/// How a run reacts to a failing (profile, model) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FanOutPolicy {
    /// The first failure fails the whole run; pending calls are dropped
    #[default]
    FailFast,
    /// Failures are reported per pair next to the successes
    Isolate,
}

enum Services {
    Shared(ServiceRegistry),
    PerRequest(ProviderClients),
}

/// Runs steps across the cross product of profiles and models
pub struct Orchestrator {
    services: Services,
}

impl Orchestrator {
    /// Orchestrator over long-lived services; histories persist across runs
    pub fn shared(registry: ServiceRegistry) -> Self {
        Self {
            services: Services::Shared(registry),
        }
    }

    /// Orchestrator building fresh services for every run on top of
    /// long-lived provider clients
    pub fn per_request(clients: ProviderClients) -> Self {
        Self {
            services: Services::PerRequest(clients),
        }
    }

    fn registry(&self) -> Cow<'_, ServiceRegistry> {
        match &self.services {
            Services::Shared(registry) => Cow::Borrowed(registry),
            Services::PerRequest(clients) => Cow::Owned(ServiceRegistry::standard(clients)),
        }
    }

    /// Profiles a run can currently use
    pub fn profiles(&self) -> Vec<Profile> {
        self.registry().profiles()
    }

    /// History of the service behind `profile`.
    ///
    /// Per-request services are dropped after their run, so their history
    /// is always empty here.
    pub async fn history(&self, profile: Profile) -> Result<Vec<String>> {
        Ok(self.registry().get(profile)?.history().await)
    }

    /// Empty the history of the service behind `profile`
    pub async fn clear_history(&self, profile: Profile) -> Result<()> {
        self.registry().get(profile)?.clear_history().await;
        tracing::info!(%profile, "history cleared");
        Ok(())
    }

    /// Run one step over every (profile, model) pair.
    ///
    /// Every profile is resolved before any call is made, so an unknown or
    /// unregistered profile fails the run without touching a provider.
    pub async fn run_step(&self, request: StepRunRequest) -> Result<StepRunResponse> {
        if request.models.is_empty() {
            return Err(BridgeError::MissingInput("models"));
        }

        let registry = self.registry();
        let services = resolve_services(&registry, &request.profiles)?;
        let policy = if request.isolate_failures {
            FanOutPolicy::Isolate
        } else {
            FanOutPolicy::FailFast
        };

        tracing::info!(
            session_id = %request.session_id,
            step_index = request.step_index,
            profiles = services.len(),
            models = request.models.len(),
            ?policy,
            "running step"
        );

        let params = &request.params();
        let models = &request.models;
        let calls = services.iter().flat_map(move |service| {
            models
                .iter()
                .map(move |model| call_pair(service.as_ref(), params, model))
        });

        let results = match policy {
            FanOutPolicy::FailFast => try_join_all(calls).await?,
            FanOutPolicy::Isolate => join_all(calls.map(|call| async move {
                call.await.unwrap_or_else(|(profile, model, err)| {
                    tracing::warn!(%profile, %model, error = %err, "pair failed");
                    PairResult::failure(profile, model, err.to_string())
                })
            }))
            .await,
        };

        Ok(StepRunResponse {
            session_id: request.session_id,
            step_index: request.step_index,
            objective: request.objective,
            results,
        })
    }
}

/// Resolve profile keys to services; no keys means the default profile
fn resolve_services(
    registry: &ServiceRegistry,
    keys: &[String],
) -> Result<Vec<Arc<dyn StepService>>> {
    if keys.is_empty() {
        return Ok(vec![registry.get(Profile::DEFAULT)?]);
    }

    keys.iter()
        .map(|key| {
            let profile = key
                .parse::<Profile>()
                .map_err(|_| BridgeError::UnregisteredProfile(key.clone()))?;
            registry.get(profile)
        })
        .collect()
}

type PairError = (Profile, String, BridgeError);

async fn call_pair(
    service: &dyn StepService,
    params: &StepParams,
    model: &str,
) -> std::result::Result<PairResult, PairError> {
    let profile = service.profile();
    let params = StepParams {
        model: Some(model.to_string()),
        ..params.clone()
    };

    tracing::debug!(%profile, model, "calling pair");
    match service.call_model(params).await {
        Ok(output) => Ok(PairResult::success(profile, model.to_string(), output)),
        Err(err) => Err((profile, model.to_string(), err)),
    }
}

impl From<PairError> for BridgeError {
    fn from((_, _, err): PairError) -> Self {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubClient;
    use std::time::Duration;

    fn registry_with(client: Arc<StubClient>, profiles: &[Profile]) -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        for profile in profiles {
            registry.register(Arc::new(ProfileService::new(
                client.clone(),
                *profile,
                "default",
            )));
        }
        registry
    }

    fn run_request(profiles: &[&str], models: &[&str]) -> StepRunRequest {
        StepRunRequest {
            session_id: "s-1".to_string(),
            objective: "find settings".to_string(),
            step_index: 1,
            profiles: profiles.iter().map(|p| p.to_string()).collect(),
            models: models.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_single_pair() {
        let client = Arc::new(StubClient::replying(
            r#"{"action":"tap gear icon","rationale":"it is top-right","confidence":87}"#,
        ));
        let orchestrator =
            Orchestrator::shared(registry_with(client, &[Profile::ComponentAnalysis]));

        let response = orchestrator
            .run_step(run_request(&["AnalisysComponentsLLM"], &["m-a"]))
            .await
            .unwrap();

        assert_eq!(response.session_id, "s-1");
        assert_eq!(response.step_index, 1);
        assert_eq!(response.objective, "find settings");
        assert_eq!(response.results.len(), 1);
        let result = &response.results[0];
        assert_eq!(result.profile, Profile::ComponentAnalysis);
        assert_eq!(result.model, "m-a");
        assert_eq!(result.action, "tap gear icon");
        assert_eq!(result.rationale, "it is top-right");
        assert_eq!(result.confidence, 87);
    }

    #[tokio::test]
    async fn test_malformed_output_does_not_fail_the_run() {
        let client = Arc::new(StubClient::replying("not json"));
        let orchestrator =
            Orchestrator::shared(registry_with(client, &[Profile::ComponentAnalysis]));

        let response = orchestrator
            .run_step(run_request(&["AnalisysComponentsLLM"], &["m-a"]))
            .await
            .unwrap();

        let result = &response.results[0];
        assert_eq!(
            (result.action.as_str(), result.rationale.as_str(), result.confidence),
            ("", "", 0)
        );
    }

    #[tokio::test]
    async fn test_cross_product_order_ignores_completion_order() {
        // Earlier pairs answer slower, so completion order is reversed
        let client = Arc::new(
            StubClient::new(|request| {
                Ok(format!(
                    r#"{{"action":"{}@{}","confidence":1}}"#,
                    request.profile, request.model
                ))
            })
            .with_delay_by(|request| {
                let slowest = match (request.profile, request.model.as_str()) {
                    (Profile::Guide, "m1") => 4,
                    (Profile::Guide, _) => 3,
                    (_, "m1") => 2,
                    _ => 1,
                };
                Duration::from_millis(60 * slowest)
            }),
        );
        let orchestrator = Orchestrator::shared(registry_with(
            client.clone(),
            &[Profile::Guide, Profile::CognitiveWalkthrough],
        ));

        let response = orchestrator
            .run_step(run_request(&["GuideLLM", "CongnitiveWalktroughLLM"], &["m1", "m2"]))
            .await
            .unwrap();

        let tags: Vec<(Profile, &str, &str)> = response
            .results
            .iter()
            .map(|r| (r.profile, r.model.as_str(), r.action.as_str()))
            .collect();
        assert_eq!(
            tags,
            vec![
                (Profile::Guide, "m1", "GuideLLM@m1"),
                (Profile::Guide, "m2", "GuideLLM@m2"),
                (Profile::CognitiveWalkthrough, "m1", "CongnitiveWalktroughLLM@m1"),
                (Profile::CognitiveWalkthrough, "m2", "CongnitiveWalktroughLLM@m2"),
            ]
        );
        assert_eq!(
            client.completed(),
            vec![
                (Profile::CognitiveWalkthrough, "m2".to_string()),
                (Profile::CognitiveWalkthrough, "m1".to_string()),
                (Profile::Guide, "m2".to_string()),
                (Profile::Guide, "m1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_pairs_run_concurrently() {
        let client = Arc::new(StubClient::replying("{}").with_delay(Duration::from_millis(200)));
        let orchestrator = Orchestrator::shared(registry_with(client, &[Profile::Guide]));

        let started = std::time::Instant::now();
        let response = orchestrator
            .run_step(run_request(&["GuideLLM"], &["m1", "m2", "m3", "m4"]))
            .await
            .unwrap();

        assert_eq!(response.results.len(), 4);
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_no_profiles_means_default_profile() {
        let client = Arc::new(StubClient::replying("{}"));
        let orchestrator = Orchestrator::shared(registry_with(
            client.clone(),
            &[Profile::Guide, Profile::ComponentAnalysis],
        ));

        let response = orchestrator.run_step(run_request(&[], &["m1", "m2"])).await.unwrap();

        assert_eq!(response.results.len(), 2);
        assert!(response
            .results
            .iter()
            .all(|r| r.profile == Profile::ComponentAnalysis));
    }

    #[tokio::test]
    async fn test_unregistered_profile_fails_whole_batch() {
        let client = Arc::new(StubClient::replying("{}"));
        let orchestrator = Orchestrator::shared(registry_with(client.clone(), &[Profile::Guide]));

        let err = orchestrator
            .run_step(run_request(&["GuideLLM", "AnalisysComponentsLLM"], &["m1"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::UnregisteredProfile(ref key) if key == "AnalisysComponentsLLM"
        ));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_profile_key_fails_whole_batch() {
        let client = Arc::new(StubClient::replying("{}"));
        let orchestrator = Orchestrator::shared(registry_with(client, &Profile::ALL));

        let err = orchestrator
            .run_step(run_request(&["GuideLLM", "Nope"], &["m1"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "LLM service not found for profile: Nope");
    }

    #[tokio::test]
    async fn test_empty_models_rejected() {
        let client = Arc::new(StubClient::replying("{}"));
        let orchestrator = Orchestrator::shared(registry_with(client.clone(), &Profile::ALL));

        let err = orchestrator.run_step(run_request(&["GuideLLM"], &[])).await.unwrap_err();
        assert!(matches!(err, BridgeError::MissingInput("models")));
        assert!(client.requests().is_empty());
    }

    fn failing_on_m2() -> Arc<StubClient> {
        Arc::new(StubClient::new(|request| {
            if request.model == "m2" {
                Err(BridgeError::Upstream {
                    provider: crate::error::Provider::OpenRouter,
                    status: 503,
                    detail: "unavailable".to_string(),
                })
            } else {
                Ok(r#"{"action":"ok","confidence":90}"#.to_string())
            }
        }))
    }

    #[tokio::test]
    async fn test_provider_failure_fails_batch_by_default() {
        let orchestrator = Orchestrator::shared(registry_with(failing_on_m2(), &[Profile::Guide]));

        let err = orchestrator
            .run_step(run_request(&["GuideLLM"], &["m1", "m2"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_isolated_failures_are_reported_per_pair() {
        let orchestrator = Orchestrator::shared(registry_with(failing_on_m2(), &[Profile::Guide]));
        let mut request = run_request(&["GuideLLM"], &["m1", "m2", "m3"]);
        request.isolate_failures = true;

        let response = orchestrator.run_step(request).await.unwrap();

        assert_eq!(response.results.len(), 3);
        assert!(!response.results[0].is_failure());
        assert_eq!(response.results[0].action, "ok");
        assert!(response.results[1].is_failure());
        assert_eq!(response.results[1].model, "m2");
        assert_eq!(
            response.results[1].error.as_deref(),
            Some("OpenRouter error (503): unavailable")
        );
        assert!(!response.results[2].is_failure());
    }

    #[tokio::test]
    async fn test_standard_registry_skips_missing_clients() {
        let chat: Arc<dyn crate::client::StepClient> = Arc::new(StubClient::replying("{}"));
        let registry = ServiceRegistry::standard(&ProviderClients {
            chat: Some(chat),
            vision: None,
        });

        assert_eq!(
            registry.profiles(),
            vec![Profile::Guide, Profile::CognitiveWalkthrough]
        );
        assert!(registry.get(Profile::ComponentAnalysis).is_err());
    }

    #[tokio::test]
    async fn test_per_request_services_start_with_fresh_history() {
        let chat = Arc::new(StubClient::replying(r#"{"action":"a","confidence":5}"#));
        let vision = Arc::new(StubClient::replying(r#"{"action":"b","confidence":6}"#));
        let orchestrator = Orchestrator::per_request(ProviderClients {
            chat: Some(chat.clone()),
            vision: Some(vision.clone()),
        });

        let response = orchestrator
            .run_step(run_request(&["GuideLLM", "AnalisysComponentsLLM"], &["m1"]))
            .await
            .unwrap();

        assert_eq!(response.results[0].action, "a");
        assert_eq!(response.results[1].action, "b");
        assert_eq!(chat.requests().len(), 1);
        assert_eq!(vision.requests().len(), 1);
        assert_eq!(orchestrator.profiles(), Profile::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_shared_history_can_be_cleared() {
        let client = Arc::new(StubClient::replying(r#"{"action":"tap","confidence":40}"#));
        let orchestrator = Orchestrator::shared(registry_with(client, &[Profile::Guide]));

        for _ in 0..3 {
            orchestrator
                .run_step(run_request(&["GuideLLM"], &["m1"]))
                .await
                .unwrap();
        }
        assert_eq!(orchestrator.history(Profile::Guide).await.unwrap().len(), 3);

        orchestrator.clear_history(Profile::Guide).await.unwrap();
        assert!(orchestrator.history(Profile::Guide).await.unwrap().is_empty());

        let err = orchestrator
            .clear_history(Profile::ComponentAnalysis)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnregisteredProfile(_)));
    }

    #[tokio::test]
    async fn test_per_request_history_does_not_accumulate() {
        let chat = Arc::new(StubClient::replying(r#"{"action":"a","confidence":5}"#));
        let orchestrator = Orchestrator::per_request(ProviderClients {
            chat: Some(chat),
            vision: None,
        });

        for _ in 0..3 {
            orchestrator
                .run_step(run_request(&["GuideLLM"], &["m1"]))
                .await
                .unwrap();
        }
        assert!(orchestrator.history(Profile::Guide).await.unwrap().is_empty());
    }
}
