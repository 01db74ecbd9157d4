use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{RecordId, RecordKind};

/// Structured validation error for action inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}: {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Non-2xx response from Pipedrive or the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct APIError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
    /// Raw response body for debugging (when available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
}

impl APIError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            request_id: None,
            raw_body: None,
        }
    }
}

impl fmt::Display for APIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "{} ({}): {}", code, self.status, self.message)
        } else {
            write!(f, "{}: {}", self.status, self.message)
        }
    }
}

impl std::error::Error for APIError {}

/// Convenience alias for fallible results.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Transport-level error (timeouts, DNS/TLS/connectivity).
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
}

/// Broad transport error kinds for classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Request,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Other => "transport",
        };
        write!(f, "{label}")
    }
}

/// Which call of a detail aggregation failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DetailPart {
    Record,
    Activities,
    Notes,
}

impl fmt::Display for DetailPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DetailPart::Record => "details",
            DetailPart::Activities => "activities",
            DetailPart::Notes => "notes",
        };
        write!(f, "{label}")
    }
}

/// Unified error type surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Api(#[from] APIError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("failed to fetch {kind} {part} for {id}: {source}")]
    DetailFetch {
        kind: RecordKind,
        id: RecordId,
        part: DetailPart,
        #[source]
        source: Box<Error>,
    },

    #[error("no matching leads or deals found")]
    NoMatch,

    #[error("completion returned no content")]
    EmptyCompletion,
}

impl Error {
    pub(crate) fn detail_fetch(
        kind: RecordKind,
        id: &RecordId,
        part: DetailPart,
        source: Error,
    ) -> Self {
        Error::DetailFetch {
            kind,
            id: id.clone(),
            part,
            source: Box::new(source),
        }
    }

    /// HTTP status of the underlying API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.status),
            Error::DetailFetch { source, .. } => source.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_formats_with_field() {
        let err = ValidationError::new("is required").with_field("searchTerm");
        assert_eq!(err.to_string(), "searchTerm: is required");
    }

    #[test]
    fn api_error_keeps_status_and_body() {
        let api_err = APIError {
            status: 401,
            code: Some("unauthorized".into()),
            message: "invalid api token".into(),
            request_id: Some("req_123".into()),
            raw_body: Some("{\"success\":false}".into()),
        };

        assert_eq!(api_err.to_string(), "unauthorized (401): invalid api token");
        assert!(api_err.raw_body.is_some());
    }

    #[test]
    fn detail_fetch_names_kind_part_and_id() {
        let err = Error::detail_fetch(
            RecordKind::Deal,
            &RecordId::Int(42),
            DetailPart::Record,
            APIError::new(404, "Deal not found").into(),
        );
        assert_eq!(
            err.to_string(),
            "failed to fetch deal details for 42: 404: Deal not found"
        );
        assert_eq!(err.status(), Some(404));
    }
}
