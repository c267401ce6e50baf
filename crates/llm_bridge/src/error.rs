//! Error taxonomy for provider calls and orchestration

use std::fmt;
use thiserror::Error;

/// External API a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenRouter,
    Gemini,
    Nvidia,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenRouter => "OpenRouter",
            Provider::Gemini => "Google AI",
            Provider::Nvidia => "NVIDIA Object Detection",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Credential absent at construction; the client is never built
    #[error("{provider} is not configured: {var} environment variable not set")]
    MissingCredential {
        provider: Provider,
        var: &'static str,
    },

    #[error("{provider} request failed: {source}")]
    Http {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success answer from the provider
    #[error("{provider} error ({status}): {detail}")]
    Upstream {
        provider: Provider,
        status: u16,
        detail: String,
    },

    #[error("{provider} request cancelled")]
    Cancelled { provider: Provider },

    #[error("LLM service not found for profile: {0}")]
    UnregisteredProfile(String),

    #[error("{0} is required")]
    MissingInput(&'static str),
}

impl BridgeError {
    pub(crate) fn http(provider: Provider) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Http { provider, source }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::UnregisteredProfile(_) | Self::MissingInput(_))
    }
}
