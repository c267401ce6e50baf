//! Test doubles shared by the unit tests

use crate::client::StepClient;
use crate::error::{BridgeError, Provider, Result};
use async_trait::async_trait;
use axum::Router;
use futures::future::AbortRegistration;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use step_core::{Profile, StepOutput, StepRequest};

/// Serve `router` on an ephemeral local port and return its base URL
pub(crate) async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

type Reply = Box<dyn Fn(&StepRequest) -> Result<String> + Send + Sync>;
type Delay = Box<dyn Fn(&StepRequest) -> Duration + Send + Sync>;

/// Provider client answering from a closure and recording every request
pub(crate) struct StubClient {
    reply: Reply,
    delay: Option<Delay>,
    requests: Mutex<Vec<StepRequest>>,
    completed: Mutex<Vec<(Profile, String)>>,
}

impl StubClient {
    pub(crate) fn new(
        reply: impl Fn(&StepRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            reply: Box::new(reply),
            delay: None,
            requests: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `content`
    pub(crate) fn replying(content: &str) -> Self {
        let content = content.to_string();
        Self::new(move |_| Ok(content.clone()))
    }

    /// Always fail with an upstream 500
    pub(crate) fn failing() -> Self {
        Self::new(|_| {
            Err(BridgeError::Upstream {
                provider: Provider::OpenRouter,
                status: 500,
                detail: "stub failure".to_string(),
            })
        })
    }

    /// Sleep before answering
    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        self.with_delay_by(move |_| delay)
    }

    /// Sleep for a per-request duration before answering
    pub(crate) fn with_delay_by(
        mut self,
        delay: impl Fn(&StepRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub(crate) fn requests(&self) -> Vec<StepRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// (profile, model) of every answered request, in completion order
    pub(crate) fn completed(&self) -> Vec<(Profile, String)> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepClient for StubClient {
    fn provider(&self) -> Provider {
        Provider::OpenRouter
    }

    async fn call_step(
        &self,
        request: &StepRequest,
        _abort: Option<AbortRegistration>,
    ) -> Result<StepOutput> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }
        self.completed
            .lock()
            .unwrap()
            .push((request.profile, request.model.clone()));
        let content = (self.reply)(request)?;
        Ok(StepOutput::from_content(&content, json!({ "content": content })))
    }
}
