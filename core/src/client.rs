use crate::config::ClientSettings;
use crate::error::ClientError;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Http,
    Mock,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("http") {
            Some(Self::Http)
        } else if value.eq_ignore_ascii_case("mock") {
            Some(Self::Mock)
        } else {
            None
        }
    }
}

/// Raw body of `GET /oauth/status/{user_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusPayload {
    pub is_authenticated: bool,
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
    #[serde(default)]
    pub needs_refresh: bool,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub content: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickActionRequest {
    pub action: String,
    pub user_id: String,
    pub context: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentReply {
    pub response: String,
}

#[async_trait]
pub trait StatusClient: Send + Sync {
    async fn fetch_status(&self, user_id: &str) -> Result<StatusPayload, ClientError>;
}

#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<AgentReply, ClientError>;

    async fn quick_action(&self, request: &QuickActionRequest)
        -> Result<AgentReply, ClientError>;
}

/// The pair of collaborators a session talks to.
#[derive(Clone)]
pub struct Backend {
    pub status: Arc<dyn StatusClient>,
    pub agent: Arc<dyn AgentClient>,
}

impl Backend {
    pub fn new(status: Arc<dyn StatusClient>, agent: Arc<dyn AgentClient>) -> Self {
        Self { status, agent }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        match settings.backend {
            BackendKind::Http => {
                let http = Arc::new(HttpBackend::new(
                    settings.api_url.clone(),
                    settings.request_timeout,
                )?);
                Ok(Self::new(http.clone(), http))
            }
            BackendKind::Mock => {
                let mock = Arc::new(MockBackend::default());
                Ok(Self::new(mock.clone(), mock))
            }
        }
    }
}

/// reqwest-backed client for the dashboard API.
#[derive(Clone)]
pub struct HttpBackend {
    base: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: normalize_base(base),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|err| ClientError::backend(format!("invalid endpoint {path}: {err}")))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

fn status_error(status: StatusCode, body: String) -> ClientError {
    ClientError::Status {
        status: status.as_u16(),
        body,
    }
}

// `Url::join` drops the last path segment unless the base ends with a slash.
fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl StatusClient for HttpBackend {
    async fn fetch_status(&self, user_id: &str) -> Result<StatusPayload, ClientError> {
        let mut url = self.endpoint("oauth/status/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::backend("base url cannot carry a path"))?
            .pop_if_empty()
            .push(user_id);
        tracing::debug!(%url, "fetching oauth status");
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl AgentClient for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<AgentReply, ClientError> {
        let url = self.endpoint("agent/chat")?;
        let response = self.http.post(url).json(request).send().await?;
        Self::decode(response).await
    }

    async fn quick_action(
        &self,
        request: &QuickActionRequest,
    ) -> Result<AgentReply, ClientError> {
        let url = self.endpoint("agent/quick-action")?;
        let response = self.http.post(url).json(request).send().await?;
        Self::decode(response).await
    }
}

/// In-process backend used for offline runs and smoke tests.
///
/// Status answers come from a queue of scripted results (the last one is
/// reused once the queue drains). Agent calls echo the prompt after a short
/// delay unless a failure has been queued.
pub struct MockBackend {
    statuses: Mutex<VecDeque<Result<StatusPayload, String>>>,
    last_status: Mutex<StatusPayload>,
    agent_failures: Mutex<VecDeque<String>>,
    latency: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(StatusPayload {
            is_authenticated: true,
            expires_in_seconds: Some(3 * 3600),
            needs_refresh: false,
            scopes: Some(vec![
                "https://www.googleapis.com/auth/youtube.readonly".to_string(),
                "https://www.googleapis.com/auth/yt-analytics.readonly".to_string(),
            ]),
        })
    }
}

impl MockBackend {
    pub fn new(status: StatusPayload) -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(status),
            agent_failures: Mutex::new(VecDeque::new()),
            latency: Duration::from_millis(20),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_status(&self, status: StatusPayload) {
        self.statuses.lock().push_back(Ok(status));
    }

    pub fn push_status_failure(&self, message: impl Into<String>) {
        self.statuses.lock().push_back(Err(message.into()));
    }

    pub fn fail_next_agent_call(&self, message: impl Into<String>) {
        self.agent_failures.lock().push_back(message.into());
    }

    async fn reply(&self, text: String) -> Result<AgentReply, ClientError> {
        sleep(self.latency).await;
        if let Some(message) = self.agent_failures.lock().pop_front() {
            return Err(ClientError::Backend(message));
        }
        Ok(AgentReply { response: text })
    }
}

#[async_trait]
impl StatusClient for MockBackend {
    async fn fetch_status(&self, _user_id: &str) -> Result<StatusPayload, ClientError> {
        sleep(self.latency).await;
        let next = self.statuses.lock().pop_front();
        match next {
            Some(Ok(status)) => {
                *self.last_status.lock() = status.clone();
                Ok(status)
            }
            Some(Err(message)) => Err(ClientError::Backend(message)),
            None => Ok(self.last_status.lock().clone()),
        }
    }
}

#[async_trait]
impl AgentClient for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<AgentReply, ClientError> {
        self.reply(format!("[Mock agent] received '{}'.", request.content))
            .await
    }

    async fn quick_action(
        &self,
        request: &QuickActionRequest,
    ) -> Result<AgentReply, ClientError> {
        self.reply(format!(
            "[Mock agent] ran {} with context {}.",
            request.action, request.context
        ))
        .await
    }
}
