//! Pipedrive lead/deal lookup: search both collections, pick the best match,
//! and return either its full detail as bounded JSON text or an LLM summary.
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::time::Duration;

/// Default User-Agent header value.
pub(crate) const DEFAULT_CLIENT_HEADER: &str =
    concat!("pipedrive-lookup-rust/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (60 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default chat-completions base URL.
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";

/// HTTP header carrying the Pipedrive API token.
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Hits requested per search call (first page only).
pub const SEARCH_RESULT_LIMIT: usize = 10;

/// Fields the search endpoints match against.
pub const SEARCH_FIELDS: &str = "title,custom_fields,notes";

/// Upper bound on the rendered lookup payload, in characters.
pub const MAX_PAYLOAD_CHARS: usize = 90_000;

/// Closest candidates listed per collection when nothing matched.
pub const CLOSEST_MATCH_LIMIT: usize = 3;

/// Deal activities included in a summary prompt.
pub const SUMMARY_ACTIVITY_LIMIT: usize = 10;

mod actions;
mod assemble;
mod client;
mod completion;
mod detail;
mod errors;
mod http;
pub mod matching;
mod search;
mod summary;
mod telemetry;
mod types;

pub use actions::{
    ActionOptions, ActionOutput, LookupInput, SummaryInput, run_lookup, run_summary,
    summarize_best_match,
};
pub use assemble::{
    BestMatch, ClosestMatch, ClosestMatches, NO_MATCH_MESSAGE, Outcome, ResponsePayload, assemble,
    prune_nulls, truncate_chars,
};
pub use client::{Client, Config};
pub use completion::{
    BoxFuture, ChatMessage, CompletionBackend, CompletionChoice, CompletionConfig,
    CompletionMessage, CompletionRequest, CompletionResponse, MessageRole, OpenAiCompletion,
};
pub use errors::{
    APIError, DetailPart, Error, Result, TransportError, TransportErrorKind, ValidationError,
};
pub use http::{HeaderEntry, HeaderList};
pub use matching::{MatchCandidate, best_gated_match, best_match, score_hit};
pub use summary::{SUMMARY_SYSTEM_PROMPT, SummarySubject, build_prompt, summarize};
pub use telemetry::{
    DiagnosticEvent, DiagnosticLevel, DiagnosticsCallbacks, HttpRequestMetrics, RequestContext,
};
pub use types::{
    Activity, AggregatedRecord, NamedRef, Note, RecordId, RecordKind, SearchHit, SearchResults,
};
