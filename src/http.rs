use std::time::Instant;

use reqwest::{StatusCode, header::HeaderMap};
use serde::de::DeserializeOwned;

use crate::{
    errors::{APIError, Error, Result, TransportError, TransportErrorKind},
    telemetry::{DiagnosticEvent, DiagnosticLevel, HttpRequestMetrics, RequestContext, Telemetry},
};

/// Structured header list with validation.
#[derive(Clone, Debug, Default)]
pub struct HeaderList(Vec<HeaderEntry>);

impl HeaderList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a header entry.
    ///
    /// # Panics
    /// Panics if the header key or value is empty or contains only whitespace.
    pub fn push(&mut self, entry: HeaderEntry) {
        assert!(
            entry.is_valid(),
            "Invalid header: key and value must be non-empty (got key={:?}, value={:?})",
            entry.key,
            entry.value
        );
        self.0.push(entry);
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(HeaderEntry::new(key.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.0.iter()
    }
}

#[derive(Clone, Debug)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(key: String, value: String) -> Self {
        Self { key, value }
    }

    pub fn is_valid(&self) -> bool {
        !(self.key.trim().is_empty() || self.value.trim().is_empty())
    }
}

pub(crate) fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    ["X-Request-Id", "x-correlation-id"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Build an [`APIError`] from a failed response.
///
/// Understands Pipedrive's `{"success": false, "error": "...", "error_info": "..."}`
/// body and the `{"error": {"message", "type", "code"}}` shape used by
/// chat-completion endpoints. Anything else keeps the raw body as message.
pub(crate) fn parse_api_error_parts(
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
) -> Error {
    let request_id = request_id_from_headers(headers);
    let status_code = status.as_u16();
    let status_text = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();

    if body.trim().is_empty() {
        return APIError {
            status: status_code,
            code: None,
            message: status_text,
            request_id,
            raw_body: None,
        }
        .into();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
        if let Some(err_obj) = value.get("error").and_then(|v| v.as_object()) {
            let code = err_obj
                .get("code")
                .or_else(|| err_obj.get("type"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let message = err_obj
                .get("message")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| status_text.clone());
            return APIError {
                status: status_code,
                code,
                message,
                request_id,
                raw_body: Some(body),
            }
            .into();
        }

        if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
            let code = value
                .get("errorCode")
                .or_else(|| value.get("code"))
                .and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
            let message = match value.get("error_info").and_then(|v| v.as_str()) {
                Some(info) if !info.trim().is_empty() => format!("{message} ({info})"),
                _ => message.to_string(),
            };
            return APIError {
                status: status_code,
                code,
                message,
                request_id,
                raw_body: Some(body),
            }
            .into();
        }
    }

    APIError {
        status: status_code,
        code: None,
        message: body.clone(),
        request_id,
        raw_body: Some(body),
    }
    .into()
}

/// Send a request once (no retries) and return the response if it succeeded.
///
/// Non-2xx responses become [`Error::Api`]; transport failures become
/// [`Error::Transport`]. Both are reported to the HTTP metrics callback.
pub(crate) async fn send_once(
    builder: reqwest::RequestBuilder,
    telemetry: &Telemetry,
    ctx: RequestContext,
) -> Result<reqwest::Response> {
    #[cfg(feature = "tracing")]
    {
        use tracing::Instrument;
        let span = tracing::debug_span!(
            "pipedrive_lookup.http",
            method = %ctx.method,
            path = %ctx.path
        );
        send_and_record(builder, telemetry, ctx)
            .instrument(span)
            .await
    }
    #[cfg(not(feature = "tracing"))]
    {
        send_and_record(builder, telemetry, ctx).await
    }
}

async fn send_and_record(
    builder: reqwest::RequestBuilder,
    telemetry: &Telemetry,
    ctx: RequestContext,
) -> Result<reqwest::Response> {
    let start = Instant::now();
    match builder.send().await {
        Ok(resp) => {
            let status = resp.status();
            let http_ctx = if ctx.request_id.is_none() {
                ctx.with_request_id(request_id_from_headers(resp.headers()))
            } else {
                ctx
            };
            if telemetry.http_enabled() {
                telemetry.record_http(HttpRequestMetrics {
                    latency: start.elapsed(),
                    status: Some(status.as_u16()),
                    error: (!status.is_success()).then(|| format!("http {}", status.as_u16())),
                    context: http_ctx.clone(),
                });
            }
            if status.is_success() {
                telemetry.emit(
                    DiagnosticEvent::new(
                        DiagnosticLevel::Debug,
                        format!("request completed in {}ms", start.elapsed().as_millis()),
                        http_ctx,
                    )
                    .with_status(Some(status.as_u16())),
                );
                return Ok(resp);
            }
            let headers = resp.headers().clone();
            let body = resp.text().await.unwrap_or_default();
            Err(parse_api_error_parts(status, &headers, body))
        }
        Err(err) => {
            if telemetry.http_enabled() {
                telemetry.record_http(HttpRequestMetrics {
                    latency: start.elapsed(),
                    status: None,
                    error: Some(err.to_string()),
                    context: ctx,
                });
            }
            Err(to_transport_error(err))
        }
    }
}

/// Send a request once and decode its JSON body.
pub(crate) async fn execute_json<T: DeserializeOwned>(
    builder: reqwest::RequestBuilder,
    telemetry: &Telemetry,
    ctx: RequestContext,
) -> Result<T> {
    let resp = send_once(builder, telemetry, ctx).await?;
    let bytes = resp.bytes().await.map_err(to_transport_error)?;
    serde_json::from_slice::<T>(&bytes).map_err(Error::Serialization)
}

pub(crate) fn to_transport_error(err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_request() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    };

    TransportError {
        kind,
        message: err.to_string(),
        source: Some(err),
    }
    .into()
}
