use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The two Pipedrive collections this crate searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Lead,
    Deal,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Lead => "lead",
            RecordKind::Deal => "deal",
        }
    }

    /// Path segment of the collection (`leads` / `deals`).
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Lead => "leads",
            RecordKind::Deal => "deals",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque record identifier. Leads use UUID strings, deals use integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

/// Nested `{id, name}` reference (organization or person) on a search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single hit from `/{leads|deals}/search`, unwrapped from its `item` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchHit {
    /// Decode one entry of a search response's `data.items`.
    ///
    /// Entries usually look like `{"result_score": 1.2, "item": {...}}`; bare
    /// records are accepted too. The envelope score wins over one embedded in
    /// the record.
    pub fn from_search_item(value: Value) -> serde_json::Result<Self> {
        let Value::Object(mut outer) = value else {
            return serde_json::from_value(value);
        };
        match outer.remove("item") {
            Some(Value::Object(mut inner)) => {
                if let Some(score) = outer.remove("result_score").filter(|v| !v.is_null()) {
                    inner.insert("result_score".to_string(), score);
                }
                serde_json::from_value(Value::Object(inner))
            }
            Some(other) => {
                outer.insert("item".to_string(), other);
                serde_json::from_value(Value::Object(outer))
            }
            None => serde_json::from_value(Value::Object(outer)),
        }
    }

    pub fn organization_name(&self) -> Option<&str> {
        self.organization.as_ref().and_then(|o| o.name.as_deref())
    }

    pub fn person_name(&self) -> Option<&str> {
        self.person.as_ref().and_then(|p| p.name.as_deref())
    }

    /// Remote relevance score, `0.0` when the CRM omitted it. Ranking uses
    /// `result_score` directly so a missing score never wins a tie.
    pub fn remote_score(&self) -> f64 {
        self.result_score.unwrap_or(0.0)
    }
}

/// Hits returned by one search call. Empty when the search failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub items: Vec<SearchHit>,
    /// Items in the response envelope, including any that failed to decode.
    #[serde(default)]
    pub raw_count: usize,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Hit count as reported by the CRM, before malformed hits were dropped.
    pub fn found(&self) -> usize {
        self.raw_count.max(self.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Activity attached to a lead or deal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Note attached to a lead or deal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full record plus its attachments. Serializes as the record's own fields
/// with `activities` and `notes` alongside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRecord {
    #[serde(skip)]
    pub kind: RecordKind,
    #[serde(flatten)]
    pub record: Map<String, Value>,
    pub activities: Vec<Activity>,
    pub notes: Vec<Note>,
}

/// Standard Pipedrive response envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct DataEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchData {
    #[serde(default)]
    pub items: Option<Vec<Value>>,
}
