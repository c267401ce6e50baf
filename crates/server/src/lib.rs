//! uxstep REST API server
//!
//! Exposes step runs, UI element detection and the model catalog over HTTP.

pub mod config;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use llm_bridge::{
    BridgeError, NvidiaDetectionClient, Orchestrator, ProviderClients, ServiceRegistry,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use step_core::catalog::available_models;
use step_core::{DetectionRequest, DetectionResponse, Profile, StepRunRequest, StepRunResponse};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{ServerConfig, ServiceScope};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Absent when the detection credentials were missing at startup
    pub detector: Option<Arc<NvidiaDetectionClient>>,
}

impl AppState {
    /// Build long-lived clients from the environment
    pub fn from_env(scope: ServiceScope) -> Self {
        let clients = ProviderClients::from_env();
        let orchestrator = match scope {
            ServiceScope::Shared => Orchestrator::shared(ServiceRegistry::standard(&clients)),
            ServiceScope::PerRequest => Orchestrator::per_request(clients),
        };

        let detector = match NvidiaDetectionClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(err) => {
                tracing::warn!(error = %err, "detection disabled");
                None
            }
        };

        Self {
            orchestrator: Arc::new(orchestrator),
            detector,
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/models", get(list_models))
        .route("/openrouter/models", get(list_models))
        .route("/profiles", get(list_profiles))
        .route(
            "/profiles/:profile/history",
            get(profile_history).delete(clear_profile_history),
        )
        .route("/sessions/:session_id/steps", post(run_step))
        .route("/sessions/:session_id/detections", post(detect))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the process is stopped
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_env(config.scope);
    tracing::info!(
        profiles = ?state.orchestrator.profiles(),
        detection = state.detector.is_some(),
        scope = ?config.scope,
        "providers ready"
    );

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: available_models(),
    })
}

async fn list_profiles(State(state): State<Arc<AppState>>) -> Json<ProfilesResponse> {
    Json(ProfilesResponse {
        profiles: state
            .orchestrator
            .profiles()
            .into_iter()
            .map(|profile| profile.key())
            .collect(),
    })
}

async fn profile_history(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let profile = parse_profile(&key)?;
    let history = state.orchestrator.history(profile).await?;
    Ok(Json(HistoryResponse {
        profile: profile.key(),
        history,
    }))
}

async fn clear_profile_history(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let profile = parse_profile(&key)?;
    state.orchestrator.clear_history(profile).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_profile(key: &str) -> Result<Profile, ApiError> {
    key.parse()
        .map_err(|_| BridgeError::UnregisteredProfile(key.to_string()).into())
}

async fn run_step(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<StepRunRequest>, JsonRejection>,
) -> Result<Json<StepRunResponse>, ApiError> {
    let Json(mut request) = payload?;
    request.session_id = session_id;
    let response = state.orchestrator.run_step(request).await?;
    Ok(Json(response))
}

async fn detect(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let Json(request) = payload?;
    if request.image_base64.trim().is_empty() {
        return Err(BridgeError::MissingInput("imageBase64").into());
    }
    let detector = state
        .detector
        .as_ref()
        .ok_or(ApiError::NotConfigured("object detection"))?;

    let result = detector.detect(&request.image_base64, None).await?;
    Ok(Json(DetectionResponse {
        session_id,
        detections: result.detections,
        raw_response: result.raw_response,
    }))
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<&'static str>,
}

#[derive(Serialize)]
struct ProfilesResponse {
    profiles: Vec<&'static str>,
}

#[derive(Serialize)]
struct HistoryResponse {
    profile: &'static str,
    history: Vec<String>,
}

/// Error returned by the API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("{0} is not configured on this server")]
    NotConfigured(&'static str),

    /// Body missing, not JSON, or not the expected shape
    #[error("invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Bridge(err) if !err.is_caller_error() => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR")
            }
            ApiError::Bridge(BridgeError::UnregisteredProfile(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNREGISTERED_PROFILE")
            }
            ApiError::Bridge(_) | ApiError::InvalidBody(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            ApiError::NotConfigured(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_NOT_CONFIGURED")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({ "error": code, "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
