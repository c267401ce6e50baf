//! Server configuration from the environment

use anyhow::{Context, Result};
use std::str::FromStr;

/// Lifetime of the step services behind the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServiceScope {
    /// Services built once at startup; histories live as long as the process
    /// and are emptied through the history route
    Shared,
    /// Services built per request on top of the startup clients
    #[default]
    PerRequest,
}

impl FromStr for ServiceScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "request" | "per-request" => Ok(Self::PerRequest),
            other => {
                anyhow::bail!("unknown service scope '{}', expected shared or request", other)
            }
        }
    }
}

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 3000)
    pub port: u16,
    pub scope: ServiceScope,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            scope: ServiceScope::default(),
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT` and `STEP_SERVICE_SCOPE`, keeping defaults for unset ones
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        }
        if let Some(scope) = lookup("STEP_SERVICE_SCOPE") {
            config.scope = scope.parse()?;
        }

        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
