//! Natural-language summary of a matched lead or deal.

use std::fmt::Write as _;

use crate::{
    completion::{ChatMessage, CompletionBackend, CompletionRequest},
    errors::{Error, Result},
    matching::MatchCandidate,
    types::{Activity, RecordKind},
};

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a sales assistant. You write short, factual \
summaries of CRM records for account executives and never add information that is not in the data.";

/// What gets summarized: the matched hit and, for deals, its activities.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySubject {
    pub kind: RecordKind,
    pub candidate: MatchCandidate,
    pub activities: Vec<Activity>,
}

impl SummarySubject {
    pub fn lead(candidate: MatchCandidate) -> Self {
        Self {
            kind: RecordKind::Lead,
            candidate,
            activities: Vec::new(),
        }
    }

    pub fn deal(candidate: MatchCandidate, activities: Vec<Activity>) -> Self {
        Self {
            kind: RecordKind::Deal,
            candidate,
            activities,
        }
    }
}

/// Render the user prompt for `subject`.
pub fn build_prompt(subject: &SummarySubject) -> Result<String> {
    let kind = subject.kind;
    let record_json = serde_json::to_string_pretty(&subject.candidate.hit)?;

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Summarize the following Pipedrive {kind} for a salesperson who is about to contact them."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "{} data (JSON):", capitalize(kind.as_str()));
    let _ = writeln!(prompt, "{record_json}");

    if kind == RecordKind::Deal {
        let _ = writeln!(prompt);
        if subject.activities.is_empty() {
            let _ = writeln!(prompt, "Recent activities: none recorded.");
        } else {
            let activities_json = serde_json::to_string_pretty(&subject.activities)?;
            let _ = writeln!(prompt, "Recent activities (JSON):");
            let _ = writeln!(prompt, "{activities_json}");
        }
    }

    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Formatting rules:");
    let _ = writeln!(prompt, "- Open with one sentence describing the {kind}.");
    let _ = writeln!(prompt, "- Put each contact on its own line.");
    if kind == RecordKind::Deal {
        let _ = writeln!(
            prompt,
            "- Put each activity on its own line with its date and subject."
        );
    }
    let _ = writeln!(prompt, "- Do not include any IDs.");
    if kind == RecordKind::Lead {
        let _ = writeln!(
            prompt,
            "- If the lead has no associated deals, say so explicitly."
        );
    }
    let _ = write!(
        prompt,
        "- Never make up next steps; only mention next steps that appear in the data."
    );
    Ok(prompt)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ask `backend` for a summary of `subject` using `model`.
///
/// One request, no streaming, no retries. Fails with
/// [`Error::EmptyCompletion`] when the first choice carries no text.
pub async fn summarize<B>(backend: &B, subject: &SummarySubject, model: &str) -> Result<String>
where
    B: CompletionBackend + ?Sized,
{
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(subject)?),
        ],
    };
    let response = backend.complete(request).await?;
    match response.first_text().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(Error::EmptyCompletion),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Map;

    use super::*;
    use crate::{
        completion::{BoxFuture, CompletionChoice, CompletionMessage, CompletionResponse},
        types::{RecordId, SearchHit},
    };

    struct CannedBackend {
        reply: Option<String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedBackend {
        fn new(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionBackend for CannedBackend {
        fn complete(
            &self,
            request: CompletionRequest,
        ) -> BoxFuture<'_, Result<CompletionResponse>> {
            self.seen.lock().unwrap().push(request);
            let choices = match &self.reply {
                Some(text) => vec![CompletionChoice {
                    message: Some(CompletionMessage {
                        content: Some(text.clone()),
                    }),
                }],
                None => Vec::new(),
            };
            Box::pin(async move {
                Ok::<_, Error>(CompletionResponse {
                    choices,
                    ..Default::default()
                })
            })
        }
    }

    fn candidate(title: &str) -> MatchCandidate {
        MatchCandidate {
            hit: SearchHit {
                id: RecordId::Int(12),
                title: Some(title.to_string()),
                organization: None,
                person: None,
                result_score: Some(0.5),
                extra: Map::new(),
            },
            score: 3,
            result_score: 0.5,
        }
    }

    #[test]
    fn lead_prompt_demands_explicit_no_deals_line() {
        let prompt = build_prompt(&SummarySubject::lead(candidate("Acme Contact"))).unwrap();
        assert!(prompt.starts_with("Summarize the following Pipedrive lead"));
        assert!(prompt.contains("Lead data (JSON):"));
        assert!(prompt.contains("\"title\": \"Acme Contact\""));
        assert!(prompt.contains("no associated deals"));
        assert!(!prompt.contains("Recent activities"));
    }

    #[test]
    fn deal_prompt_lists_activities() {
        let activity = Activity {
            subject: Some("Kickoff call".into()),
            due_date: Some("2024-05-01".into()),
            ..Default::default()
        };
        let prompt =
            build_prompt(&SummarySubject::deal(candidate("Acme Renewal"), vec![activity])).unwrap();
        assert!(prompt.contains("Recent activities (JSON):"));
        assert!(prompt.contains("Kickoff call"));
        assert!(prompt.contains("Do not include any IDs."));
        assert!(!prompt.contains("no associated deals"));
    }

    #[tokio::test]
    async fn summarize_returns_trimmed_text() {
        let backend = CannedBackend::new(Some("  Acme is renewing.\n"));
        let subject = SummarySubject::lead(candidate("Acme"));
        let text = summarize(&backend, &subject, "gpt-4o-mini").await.unwrap();
        assert_eq!(text, "Acme is renewing.");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].model, "gpt-4o-mini");
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0].content, SUMMARY_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn summarize_fails_without_content() {
        let backend = CannedBackend::new(None);
        let subject = SummarySubject::lead(candidate("Acme"));
        let err = summarize(&backend, &subject, "m").await.unwrap_err();
        assert!(matches!(err, Error::EmptyCompletion));

        let blank = CannedBackend::new(Some("   "));
        let err = summarize(&blank, &subject, "m").await.unwrap_err();
        assert!(matches!(err, Error::EmptyCompletion));
    }
}
