//! Building the bounded, null-free lookup payload.

use serde::Serialize;
use serde_json::Value;

use crate::{
    CLOSEST_MATCH_LIMIT, MAX_PAYLOAD_CHARS,
    errors::Result,
    types::{AggregatedRecord, RecordId, RecordKind, SearchHit, SearchResults},
};

pub const NO_MATCH_MESSAGE: &str =
    "No matching lead or deal found. The closest search results are listed below.";

/// Top-level lookup response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub search_term: String,
    pub leads_found: usize,
    pub deals_found: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Matched {
        #[serde(rename = "bestMatch")]
        best_match: BestMatch,
    },
    NoMatch {
        message: String,
        #[serde(rename = "closestMatches")]
        closest_matches: ClosestMatches,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BestMatch {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub data: AggregatedRecord,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ClosestMatches {
    pub deals: Vec<ClosestMatch>,
    pub leads: Vec<ClosestMatch>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClosestMatch {
    pub id: RecordId,
    pub title: Option<String>,
}

impl From<&SearchHit> for ClosestMatch {
    fn from(hit: &SearchHit) -> Self {
        Self {
            id: hit.id.clone(),
            title: hit.title.clone(),
        }
    }
}

impl ClosestMatches {
    pub fn from_results(leads: &SearchResults, deals: &SearchResults) -> Self {
        let take = |results: &SearchResults| -> Vec<ClosestMatch> {
            results
                .items
                .iter()
                .take(CLOSEST_MATCH_LIMIT)
                .map(ClosestMatch::from)
                .collect()
        };
        Self {
            deals: take(deals),
            leads: take(leads),
        }
    }
}

impl ResponsePayload {
    pub fn new(
        search_term: impl Into<String>,
        leads: &SearchResults,
        deals: &SearchResults,
        best: Option<AggregatedRecord>,
    ) -> Self {
        let outcome = match best {
            Some(data) => Outcome::Matched {
                best_match: BestMatch {
                    kind: data.kind,
                    data,
                },
            },
            None => Outcome::NoMatch {
                message: NO_MATCH_MESSAGE.to_string(),
                closest_matches: ClosestMatches::from_results(leads, deals),
            },
        };
        Self {
            search_term: search_term.into(),
            leads_found: leads.found(),
            deals_found: deals.found(),
            outcome,
        }
    }

    /// Null-pruned, pretty-printed text, optionally prefixed with the
    /// caller's instructions, cut to [`MAX_PAYLOAD_CHARS`].
    pub fn render(&self, instructions: Option<&str>) -> Result<String> {
        let tree = prune_nulls(serde_json::to_value(self)?);
        let body = serde_json::to_string_pretty(&tree)?;
        let text = match instructions {
            Some(instructions) => format!("Instructions: {instructions}\n\n{body}"),
            None => body,
        };
        Ok(truncate_chars(text, MAX_PAYLOAD_CHARS))
    }
}

/// Assemble and render the lookup response in one step.
pub fn assemble(
    search_term: &str,
    leads: &SearchResults,
    deals: &SearchResults,
    best: Option<AggregatedRecord>,
    instructions: Option<&str>,
) -> Result<String> {
    ResponsePayload::new(search_term, leads, deals, best).render(instructions)
}

/// Drop every object entry whose value is `null`, at any depth. Arrays keep
/// their length; their elements are pruned in place.
pub fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
        other => other,
    }
}

/// Keep the first `max_chars` characters. Not JSON-aware: the result may end
/// mid-token.
pub fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut text = text;
            text.truncate(byte_idx);
            text
        }
        None => text,
    }
}
