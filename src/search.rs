//! Free-text search against the leads and deals collections.
//!
//! A search never fails the caller: transport errors, non-2xx responses and
//! undecodable bodies are reported through diagnostics and degrade to an
//! empty result set.

use crate::{
    SEARCH_FIELDS, SEARCH_RESULT_LIMIT,
    client::Client,
    errors::Error,
    telemetry::{DiagnosticEvent, DiagnosticLevel, RequestContext},
    types::{DataEnvelope, RecordKind, SearchData, SearchHit, SearchResults},
};

pub(crate) fn search_query(term: &str) -> Vec<(&'static str, String)> {
    vec![
        ("term", term.to_string()),
        ("fields", SEARCH_FIELDS.to_string()),
        ("exact_match", "false".to_string()),
        ("limit", SEARCH_RESULT_LIMIT.to_string()),
    ]
}

impl Client {
    /// Search one collection for `term`, returning at most
    /// [`SEARCH_RESULT_LIMIT`] hits from the first page.
    pub async fn search(&self, kind: RecordKind, term: &str) -> SearchResults {
        let path = format!("{}/search", kind.collection());
        let ctx = RequestContext::new("GET", path.as_str()).with_kind(kind);
        let query = search_query(term);

        let envelope = self
            .inner
            .get_json::<DataEnvelope<SearchData>>(&path, &query, ctx.clone())
            .await;

        match envelope {
            Ok(envelope) => self.decode_hits(envelope, &ctx),
            Err(err) => {
                let (status, body) = match &err {
                    Error::Api(api) => (Some(api.status), api.raw_body.clone()),
                    _ => (None, None),
                };
                self.inner.telemetry.emit(
                    DiagnosticEvent::new(
                        DiagnosticLevel::Error,
                        format!("{kind} search failed: {err}"),
                        ctx,
                    )
                    .with_status(status)
                    .with_body(body),
                );
                SearchResults::default()
            }
        }
    }

    /// Lead and deal searches issued concurrently; both complete before
    /// this returns.
    pub async fn search_concurrently(&self, term: &str) -> (SearchResults, SearchResults) {
        tokio::join!(
            self.search(RecordKind::Lead, term),
            self.search(RecordKind::Deal, term)
        )
    }

    /// Lead search, then deal search.
    pub async fn search_sequentially(&self, term: &str) -> (SearchResults, SearchResults) {
        let leads = self.search(RecordKind::Lead, term).await;
        let deals = self.search(RecordKind::Deal, term).await;
        (leads, deals)
    }

    fn decode_hits(
        &self,
        envelope: DataEnvelope<SearchData>,
        ctx: &RequestContext,
    ) -> SearchResults {
        let raw = envelope.data.and_then(|d| d.items).unwrap_or_default();
        let raw_count = raw.len();
        let mut items = Vec::with_capacity(raw.len());
        for value in raw {
            match SearchHit::from_search_item(value) {
                Ok(hit) => items.push(hit),
                Err(err) => self
                    .inner
                    .telemetry
                    .warn(format!("dropping malformed search hit: {err}"), ctx.clone()),
            }
        }
        SearchResults { items, raw_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_has_fixed_fields_and_limit() {
        let query = search_query("Acme Corp");
        assert_eq!(
            query,
            vec![
                ("term", "Acme Corp".to_string()),
                ("fields", "title,custom_fields,notes".to_string()),
                ("exact_match", "false".to_string()),
                ("limit", "10".to_string()),
            ]
        );
    }
}
