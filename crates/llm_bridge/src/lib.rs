//! LLM Bridge for step evaluation
//!
//! Adapts three external vision APIs to one contract: an OpenRouter
//! chat-completion gateway and Google's Gemini API answer step requests,
//! an NVIDIA endpoint detects page elements. On top of the clients sit the
//! per-profile step services and the orchestrator that fans one step out
//! over profiles and models.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod client;
pub mod error;
pub mod gemini;
pub mod nvidia;
pub mod openrouter;
pub mod orchestrator;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ProviderClients, StepClient};
pub use error::{BridgeError, Provider, Result};
pub use futures::future::{AbortHandle, AbortRegistration};
pub use gemini::{GeminiClient, GeminiConfig};
pub use nvidia::{NvidiaConfig, NvidiaDetectionClient};
pub use openrouter::{OpenRouterClient, OpenRouterConfig};
pub use orchestrator::{FanOutPolicy, Orchestrator, ServiceRegistry};
pub use service::{ProfileService, StepService};
