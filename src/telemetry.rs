use std::{fmt, sync::Arc, time::Duration};

use crate::types::{RecordId, RecordKind};

/// User-provided callbacks for diagnostics and HTTP metrics.
///
/// Every component logs through these instead of writing to the console, so
/// callers (and tests) decide where warnings end up. With the `tracing`
/// feature enabled the same events are mirrored into `tracing`.
#[derive(Clone, Default)]
pub struct DiagnosticsCallbacks {
    pub event: Option<Arc<dyn Fn(DiagnosticEvent) + Send + Sync>>,
    pub http_request: Option<Arc<dyn Fn(HttpRequestMetrics) + Send + Sync>>,
}

impl DiagnosticsCallbacks {
    pub fn on_event(mut self, cb: impl Fn(DiagnosticEvent) + Send + Sync + 'static) -> Self {
        self.event = Some(Arc::new(cb));
        self
    }

    pub fn on_http_request(
        mut self,
        cb: impl Fn(HttpRequestMetrics) + Send + Sync + 'static,
    ) -> Self {
        self.http_request = Some(Arc::new(cb));
        self
    }
}

impl fmt::Debug for DiagnosticsCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsCallbacks")
            .field("event", &self.event.as_ref().map(|_| "callback"))
            .field(
                "http_request",
                &self.http_request.as_ref().map(|_| "callback"),
            )
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Debug,
    Warn,
    Error,
}

/// Request metadata shared by diagnostics and metrics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub kind: Option<RecordKind>,
    pub record_id: Option<RecordId>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_record_id(mut self, id: &RecordId) -> Self {
        self.record_id = Some(id.clone());
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        if let Some(id) = request_id {
            if !id.trim().is_empty() {
                self.request_id = Some(id);
            }
        }
        self
    }
}

/// A warning or error a component chose to recover from (or a debug note).
#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosticEvent {
    pub level: DiagnosticLevel,
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub context: RequestContext,
}

impl DiagnosticEvent {
    pub fn new(
        level: DiagnosticLevel,
        message: impl Into<String>,
        context: RequestContext,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            status: None,
            body: None,
            context,
        }
    }

    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }
}

/// HTTP request latency and outcome.
#[derive(Clone, Debug)]
pub struct HttpRequestMetrics {
    pub latency: Duration,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub context: RequestContext,
}

/// Internal helper that owns the registered callbacks (if any).
#[derive(Clone, Default)]
pub(crate) struct Telemetry {
    callbacks: DiagnosticsCallbacks,
}

impl Telemetry {
    pub fn new(callbacks: Option<DiagnosticsCallbacks>) -> Self {
        Self {
            callbacks: callbacks.unwrap_or_default(),
        }
    }

    pub fn http_enabled(&self) -> bool {
        self.callbacks.http_request.is_some()
    }

    pub fn record_http(&self, metrics: HttpRequestMetrics) {
        if let Some(cb) = &self.callbacks.http_request {
            cb(metrics);
        }
    }

    pub fn emit(&self, event: DiagnosticEvent) {
        #[cfg(feature = "tracing")]
        trace_event(&event);

        if let Some(cb) = &self.callbacks.event {
            cb(event);
        }
    }

    pub fn warn(&self, message: impl Into<String>, context: RequestContext) {
        self.emit(DiagnosticEvent::new(DiagnosticLevel::Warn, message, context));
    }
}

#[cfg(feature = "tracing")]
fn trace_event(event: &DiagnosticEvent) {
    let ctx = &event.context;
    let kind = ctx.kind.map(|k| k.as_str());
    let record_id = ctx.record_id.as_ref().map(|id| id.to_string());
    match event.level {
        DiagnosticLevel::Debug => tracing::debug!(
            method = %ctx.method,
            path = %ctx.path,
            kind = ?kind,
            record_id = ?record_id,
            "{}",
            event.message
        ),
        DiagnosticLevel::Warn => tracing::warn!(
            method = %ctx.method,
            path = %ctx.path,
            kind = ?kind,
            record_id = ?record_id,
            status = ?event.status,
            "{}",
            event.message
        ),
        DiagnosticLevel::Error => tracing::error!(
            method = %ctx.method,
            path = %ctx.path,
            kind = ?kind,
            record_id = ?record_id,
            status = ?event.status,
            body = ?event.body,
            "{}",
            event.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn emit_forwards_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let telemetry = Telemetry::new(Some(
            DiagnosticsCallbacks::default().on_event(move |e| sink.lock().unwrap().push(e)),
        ));

        telemetry.warn(
            "lead notes unavailable",
            RequestContext::new("GET", "/leads/abc/notes").with_kind(RecordKind::Lead),
        );

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, DiagnosticLevel::Warn);
        assert_eq!(events[0].context.kind, Some(RecordKind::Lead));
    }

    #[test]
    fn no_callbacks_is_silent() {
        let telemetry = Telemetry::new(None);
        assert!(!telemetry.http_enabled());
        telemetry.warn("nothing listens", RequestContext::default());
    }

    #[test]
    fn blank_request_id_is_ignored() {
        let ctx = RequestContext::new("GET", "/deals/1").with_request_id(Some("  ".into()));
        assert!(ctx.request_id.is_none());
    }
}
