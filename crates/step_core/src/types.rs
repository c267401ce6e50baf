//! Core types for step evaluation
//!
//! These types travel between the HTTP surface, the orchestrator and the
//! provider clients. The JSON form is camelCase.

use crate::profiles::Profile;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied parameters for a single model call.
///
/// The profile is deliberately absent: it is the identity of the service
/// that receives these parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepParams {
    /// Free-text goal of the user
    pub objective: String,
    /// Position of this step in the task (1-based)
    pub step_index: u32,
    /// Screenshot, bare base64 or a data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    /// Serialized UI component list from an earlier analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_json: Option<String>,
    /// Summary of previous steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_summary: Option<String>,
    /// Model override; the service default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl StepParams {
    /// Bind these parameters to a profile and a concrete model
    pub fn into_request(self, profile: Profile, model: String) -> StepRequest {
        StepRequest {
            objective: self.objective,
            step_index: self.step_index,
            image_base64: self.image_base64,
            ui_json: self.ui_json,
            history_summary: self.history_summary,
            profile,
            model,
        }
    }
}

/// Input to one provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest {
    pub objective: String,
    pub step_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_summary: Option<String>,
    pub profile: Profile,
    /// Provider-specific model identifier
    pub model: String,
}

impl StepRequest {
    /// Image payload, ignoring empty strings
    pub fn image(&self) -> Option<&str> {
        self.image_base64.as_deref().filter(|s| !s.is_empty())
    }
}

/// Normalized output of one provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    /// Recommended next action, empty when the model output was unusable
    pub action: String,
    /// Explanation of the action
    pub rationale: String,
    /// Confidence in percent (0-100)
    pub confidence: u8,
    /// Provider-native response, kept for re-parsing by the caller
    pub raw_response: Value,
    /// Model that actually answered, when the provider substituted its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_model: Option<String>,
}

impl StepOutput {
    /// Record that `model` answered instead of the requested one
    pub fn with_served_model(mut self, model: impl Into<String>) -> Self {
        self.served_model = Some(model.into());
        self
    }
}

/// One entry of an aggregated step run, tagged with its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResult {
    pub profile: Profile,
    pub model: String,
    pub action: String,
    pub rationale: String,
    pub confidence: u8,
    pub raw_response: Value,
    /// Model that actually answered, when it differs from `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_model: Option<String>,
    /// Failure detail, set only when failures are isolated per pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PairResult {
    /// Tag a successful output with its profile and model
    pub fn success(profile: Profile, model: String, output: StepOutput) -> Self {
        Self {
            profile,
            model,
            action: output.action,
            rationale: output.rationale,
            confidence: output.confidence,
            raw_response: output.raw_response,
            served_model: output.served_model,
            error: None,
        }
    }

    /// Record a failed pair with empty fields
    pub fn failure(profile: Profile, model: String, error: String) -> Self {
        Self {
            profile,
            model,
            action: String::new(),
            rationale: String::new(),
            confidence: 0,
            raw_response: Value::Null,
            served_model: None,
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Request to run one step across profiles and models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRunRequest {
    /// Opaque label, echoed back
    #[serde(default)]
    pub session_id: String,
    pub objective: String,
    pub step_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_summary: Option<String>,
    /// Profile keys; empty means the default profile
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Model identifiers, at least one
    #[serde(default)]
    pub models: Vec<String>,
    /// Report failing pairs alongside successes instead of failing the run
    #[serde(default)]
    pub isolate_failures: bool,
}

impl StepRunRequest {
    /// Parameters shared by every pair of the run
    pub fn params(&self) -> StepParams {
        StepParams {
            objective: self.objective.clone(),
            step_index: self.step_index,
            image_base64: self.image_base64.clone(),
            ui_json: self.ui_json.clone(),
            history_summary: self.history_summary.clone(),
            model: None,
        }
    }
}

/// Aggregated result of a step run, in (profile, model) cross-product order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRunResponse {
    pub session_id: String,
    pub step_index: u32,
    pub objective: String,
    pub results: Vec<PairResult>,
}

/// Output of the detection client; the detection shape is provider-defined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub detections: Value,
    pub raw_response: Value,
}

/// Detection request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    #[serde(default)]
    pub image_base64: String,
}

/// Detection result echoed with its session label
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResponse {
    pub session_id: String,
    pub detections: Value,
    pub raw_response: Value,
}
