use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_CLIENT_HEADER, DEFAULT_COMPLETION_BASE_URL, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT,
    errors::{Error, Result, TransportError, TransportErrorKind},
    http::execute_json,
    telemetry::{DiagnosticsCallbacks, RequestContext, Telemetry},
};

/// Boxed future returned by [`CompletionBackend`] implementations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Single-turn, non-streaming chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Content of the first choice's message, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

/// Text-completion capability used by the summary flow.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<CompletionResponse>>;
}

#[derive(Clone, Debug, Default)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    /// Defaults to `https://api.openai.com/v1`.
    pub base_url: Option<String>,
    pub http_client: Option<reqwest::Client>,
    pub connect_timeout: Option<Duration>,
    pub timeout: Option<Duration>,
    pub diagnostics: Option<DiagnosticsCallbacks>,
}

/// OpenAI-compatible `POST /chat/completions` client.
#[derive(Clone)]
pub struct OpenAiCompletion {
    inner: Arc<CompletionInner>,
}

struct CompletionInner {
    endpoint: reqwest::Url,
    api_key: String,
    http: reqwest::Client,
    request_timeout: Duration,
    telemetry: Telemetry,
}

impl OpenAiCompletion {
    pub fn new(cfg: CompletionConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("completion api key is required".to_string()))?;

        let base = cfg
            .base_url
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMPLETION_BASE_URL.to_string());
        let endpoint = format!("{}/chat/completions", base.trim().trim_end_matches('/'));
        let endpoint = reqwest::Url::parse(&endpoint)
            .map_err(|err| Error::Config(format!("invalid base url: {err}")))?;

        let http = match cfg.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(cfg.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .build()
                .map_err(|err| TransportError {
                    kind: TransportErrorKind::Connect,
                    message: "failed to build http client".to_string(),
                    source: Some(err),
                })?,
        };

        Ok(Self {
            inner: Arc::new(CompletionInner {
                endpoint,
                api_key,
                http,
                request_timeout: cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
                telemetry: Telemetry::new(cfg.diagnostics),
            }),
        })
    }
}

impl CompletionBackend for OpenAiCompletion {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<CompletionResponse>> {
        Box::pin(async move {
            let inner = &self.inner;
            let builder = inner
                .http
                .post(inner.endpoint.clone())
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, DEFAULT_CLIENT_HEADER)
                .bearer_auth(&inner.api_key)
                .timeout(inner.request_timeout)
                .json(&request);
            let ctx = RequestContext::new("POST", inner.endpoint.path());
            execute_json(builder, &inner.telemetry, ctx).await
        })
    }
}
