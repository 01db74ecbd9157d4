//! Full record fetches with activities and notes.
//!
//! Leads and deals deliberately differ in how attachment failures are
//! treated: a lead's activities or notes fall back to an empty list with a
//! warning, while any failed call for a deal fails the whole aggregation.

use serde::de::DeserializeOwned;
use serde_json::Map;

use crate::{
    client::Client,
    errors::{DetailPart, Error, Result},
    telemetry::{DiagnosticEvent, DiagnosticLevel, RequestContext},
    types::{Activity, AggregatedRecord, DataEnvelope, Note, RecordId, RecordKind},
};

impl Client {
    /// Fetch a record of either kind with its attachments.
    pub async fn detail(&self, kind: RecordKind, id: &RecordId) -> Result<AggregatedRecord> {
        match kind {
            RecordKind::Lead => self.lead_detail(id).await,
            RecordKind::Deal => self.deal_detail(id).await,
        }
    }

    /// Lead record (fatal on failure) plus best-effort activities and notes.
    pub async fn lead_detail(&self, id: &RecordId) -> Result<AggregatedRecord> {
        let kind = RecordKind::Lead;
        let record = self
            .fetch_part::<Map<String, serde_json::Value>>(kind, id, None, &[])
            .await
            .map_err(|err| Error::detail_fetch(kind, id, DetailPart::Record, err))?
            .unwrap_or_default();

        let activities = self
            .attachment_or_empty::<Activity>(kind, id, DetailPart::Activities)
            .await;
        let notes = self
            .attachment_or_empty::<Note>(kind, id, DetailPart::Notes)
            .await;

        Ok(AggregatedRecord {
            kind,
            record,
            activities,
            notes,
        })
    }

    /// Deal record with all custom fields expanded, then activities, then
    /// notes. Any failure is fatal.
    pub async fn deal_detail(&self, id: &RecordId) -> Result<AggregatedRecord> {
        let kind = RecordKind::Deal;
        let record = self
            .fetch_part::<Map<String, serde_json::Value>>(
                kind,
                id,
                None,
                &[("get_all_custom_fields", "true".to_string())],
            )
            .await
            .map_err(|err| Error::detail_fetch(kind, id, DetailPart::Record, err))?
            .unwrap_or_default();
        let activities = self.deal_activities(id).await?;
        let notes = self
            .fetch_part::<Vec<Note>>(kind, id, Some(DetailPart::Notes), &[])
            .await
            .map_err(|err| Error::detail_fetch(kind, id, DetailPart::Notes, err))?
            .unwrap_or_default();

        Ok(AggregatedRecord {
            kind,
            record,
            activities,
            notes,
        })
    }

    /// Activities of a deal. Failure is fatal.
    pub async fn deal_activities(&self, id: &RecordId) -> Result<Vec<Activity>> {
        let kind = RecordKind::Deal;
        self.fetch_part::<Vec<Activity>>(kind, id, Some(DetailPart::Activities), &[])
            .await
            .map(Option::unwrap_or_default)
            .map_err(|err| Error::detail_fetch(kind, id, DetailPart::Activities, err))
    }

    async fn attachment_or_empty<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        id: &RecordId,
        part: DetailPart,
    ) -> Vec<T> {
        match self.fetch_part::<Vec<T>>(kind, id, Some(part), &[]).await {
            Ok(items) => items.unwrap_or_default(),
            Err(err) => {
                let ctx = RequestContext::new("GET", part_path(kind, id, Some(part)))
                    .with_kind(kind)
                    .with_record_id(id);
                self.inner.telemetry.emit(
                    DiagnosticEvent::new(
                        DiagnosticLevel::Warn,
                        format!("could not fetch {kind} {part} for {id}: {err}"),
                        ctx,
                    )
                    .with_status(err.status()),
                );
                Vec::new()
            }
        }
    }

    /// GET `/{collection}/{id}[/{part}]`, returning the envelope's `data`.
    async fn fetch_part<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        id: &RecordId,
        part: Option<DetailPart>,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let path = part_path(kind, id, part);
        let ctx = RequestContext::new("GET", path.as_str())
            .with_kind(kind)
            .with_record_id(id);
        let envelope: DataEnvelope<T> = self.inner.get_json(&path, query, ctx).await?;
        Ok(envelope.data)
    }
}

fn part_path(kind: RecordKind, id: &RecordId, part: Option<DetailPart>) -> String {
    match part {
        None | Some(DetailPart::Record) => format!("{}/{id}", kind.collection()),
        Some(DetailPart::Activities) => format!("{}/{id}/activities", kind.collection()),
        Some(DetailPart::Notes) => format!("{}/{id}/notes", kind.collection()),
    }
}
