//! The two host-facing actions: detail lookup and LLM summary.
//!
//! A plugin host hands each action its string inputs and expects a single
//! string back. [`run_lookup`] searches both collections concurrently, ranks
//! every hit, and returns the bounded JSON payload. [`run_summary`] searches
//! them one after the other, admits only hits with a field match, and
//! returns generated prose.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    SUMMARY_ACTIVITY_LIMIT,
    assemble::assemble,
    client::{Client, Config},
    completion::{CompletionBackend, CompletionConfig, OpenAiCompletion},
    errors::{Error, Result, ValidationError},
    matching::{best_gated_match, best_match},
    summary::{SummarySubject, summarize},
    telemetry::DiagnosticsCallbacks,
};

/// Inputs of the lookup action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupInput {
    #[serde(default)]
    pub pipedrive_company_domain: String,
    #[serde(default)]
    pub pipedrive_api_key: String,
    #[serde(default)]
    pub search_term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Inputs of the summary action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInput {
    #[serde(default)]
    pub pipedrive_company_domain: String,
    #[serde(default)]
    pub pipedrive_api_key: String,
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub openai_model: String,
}

/// The single string an action hands back to its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutput {
    pub result: String,
}

/// Host-side knobs that are not action inputs.
#[derive(Clone, Debug, Default)]
pub struct ActionOptions {
    /// Replaces `https://{domain}.pipedrive.com/api/v1`.
    pub pipedrive_base_url: Option<String>,
    /// Replaces the default chat-completions base URL.
    pub completion_base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub diagnostics: Option<DiagnosticsCallbacks>,
}

fn require(value: &str, field: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("is required").with_field(field));
    }
    Ok(trimmed.to_string())
}

impl LookupInput {
    /// Trimmed copy with required fields checked. Blank instructions are
    /// treated as absent.
    pub fn validate(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            pipedrive_company_domain: require(
                &self.pipedrive_company_domain,
                "pipedriveCompanyDomain",
            )?,
            pipedrive_api_key: require(&self.pipedrive_api_key, "pipedriveApiKey")?,
            search_term: require(&self.search_term, "searchTerm")?,
            instructions: self
                .instructions
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

impl SummaryInput {
    pub fn validate(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            pipedrive_company_domain: require(
                &self.pipedrive_company_domain,
                "pipedriveCompanyDomain",
            )?,
            pipedrive_api_key: require(&self.pipedrive_api_key, "pipedriveApiKey")?,
            search_term: require(&self.search_term, "searchTerm")?,
            openai_api_key: require(&self.openai_api_key, "openaiApiKey")?,
            openai_model: require(&self.openai_model, "openaiModel")?,
        })
    }
}

fn pipedrive_client(domain: &str, api_key: &str, options: &ActionOptions) -> Result<Client> {
    Client::new(Config {
        company_domain: Some(domain.to_string()),
        api_key: Some(api_key.to_string()),
        base_url: options.pipedrive_base_url.clone(),
        timeout: options.timeout,
        diagnostics: options.diagnostics.clone(),
        ..Default::default()
    })
}

/// Search, pick the best deal (else lead), fetch its detail and render the
/// bounded payload. A missing match is not an error.
pub async fn run_lookup(input: &LookupInput, options: &ActionOptions) -> Result<ActionOutput> {
    let input = input.validate()?;
    let client = pipedrive_client(
        &input.pipedrive_company_domain,
        &input.pipedrive_api_key,
        options,
    )?;
    let term = input.search_term.as_str();

    let (leads, deals) = client.search_concurrently(term).await;
    let best_lead = best_match(&leads.items, term);
    let best_deal = best_match(&deals.items, term);

    let best = match (best_deal, best_lead) {
        (Some(deal), _) => Some(client.deal_detail(&deal.hit.id).await?),
        (None, Some(lead)) => Some(client.lead_detail(&lead.hit.id).await?),
        (None, None) => None,
    };

    let result = assemble(term, &leads, &deals, best, input.instructions.as_deref())?;
    Ok(ActionOutput { result })
}

/// Search, pick the gated best deal (else lead) and summarize it with the
/// configured completion model.
pub async fn run_summary(input: &SummaryInput, options: &ActionOptions) -> Result<ActionOutput> {
    let input = input.validate()?;
    let client = pipedrive_client(
        &input.pipedrive_company_domain,
        &input.pipedrive_api_key,
        options,
    )?;
    let backend = OpenAiCompletion::new(CompletionConfig {
        api_key: Some(input.openai_api_key.clone()),
        base_url: options.completion_base_url.clone(),
        timeout: options.timeout,
        diagnostics: options.diagnostics.clone(),
        ..Default::default()
    })?;
    let result =
        summarize_best_match(&client, &backend, &input.search_term, &input.openai_model).await?;
    Ok(ActionOutput { result })
}

/// Summary flow against caller-supplied clients.
pub async fn summarize_best_match<B>(
    client: &Client,
    backend: &B,
    term: &str,
    model: &str,
) -> Result<String>
where
    B: CompletionBackend + ?Sized,
{
    let (leads, deals) = client.search_sequentially(term).await;
    let best_lead = best_gated_match(&leads.items, term);
    let best_deal = best_gated_match(&deals.items, term);

    let subject = match (best_deal, best_lead) {
        (Some(deal), _) => {
            let activities = client.deal_activities(&deal.hit.id).await?;
            let recent = activities
                .into_iter()
                .take(SUMMARY_ACTIVITY_LIMIT)
                .collect();
            SummarySubject::deal(deal, recent)
        }
        (None, Some(lead)) => SummarySubject::lead(lead),
        (None, None) => return Err(Error::NoMatch),
    };

    summarize(backend, &subject, model).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lookup_input_uses_host_field_names() {
        let input: LookupInput = serde_json::from_value(json!({
            "pipedriveCompanyDomain": "acme",
            "pipedriveApiKey": "key",
            "searchTerm": " Acme Corp ",
            "instructions": "   "
        }))
        .unwrap();
        let valid = input.validate().unwrap();
        assert_eq!(valid.search_term, "Acme Corp");
        assert_eq!(valid.instructions, None);
    }

    #[test]
    fn missing_required_field_is_named() {
        let input = LookupInput {
            pipedrive_company_domain: "acme".into(),
            pipedrive_api_key: "key".into(),
            ..Default::default()
        };
        let err = input.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("searchTerm"));
    }

    #[test]
    fn summary_input_requires_model() {
        let input: SummaryInput = serde_json::from_value(json!({
            "pipedriveCompanyDomain": "acme",
            "pipedriveApiKey": "key",
            "searchTerm": "Acme",
            "openaiApiKey": "sk-test"
        }))
        .unwrap();
        let err = input.validate().unwrap_err();
        assert_eq!(err.to_string(), "openaiModel: is required");
    }

    #[tokio::test]
    async fn validation_runs_before_any_request() {
        let err = run_lookup(&LookupInput::default(), &ActionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
