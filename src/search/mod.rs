//! Literature search: one grounded, schema-constrained Gemini call.

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EruditeConfig;
use crate::error::{EruditeError, Result};
use crate::models::{ProviderKey, SEARCH_MODEL};
use crate::provider::{gemini, ProviderRegistry};
use crate::types::{PaperMetadata, SearchQuery, SearchResult, SearchSource, TimeRange};

/// Shown when search is attempted without a Gemini key.
pub const SEARCH_KEY_MISSING: &str =
    "A Google Gemini API key is required for the search feature. Please add one in the settings.";

/// Shown when the structured answer is not a JSON array of papers.
pub const INVALID_SEARCH_JSON: &str =
    "Failed to get structured paper data from AI. The response was not valid JSON.";

/// Runs a literature search.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &SearchQuery, cancel: &CancellationToken) -> Result<SearchResult>;
}

/// Earliest publication date allowed by `range`, counted back from `today`.
///
/// Month arithmetic clamps to the end of shorter months
/// (March 31 minus one month is the last day of February).
pub fn cutoff_date(today: NaiveDate, range: TimeRange) -> Option<NaiveDate> {
    let months = match range {
        TimeRange::All => return None,
        TimeRange::Month => 1,
        TimeRange::Year => 12,
        TimeRange::ThreeYears => 36,
    };
    today.checked_sub_months(Months::new(months))
}

/// Prompt fragment such as `published after 2024-05-31`, empty for `All`.
pub fn time_constraint(today: NaiveDate, range: TimeRange) -> String {
    cutoff_date(today, range)
        .map(|date| format!("published after {}", date.format("%Y-%m-%d")))
        .unwrap_or_default()
}

/// Natural-language search instruction.
pub fn search_prompt(query: &SearchQuery, today: NaiveDate) -> String {
    let constraint = time_constraint(today, query.time_range);
    let constraint = if constraint.is_empty() {
        constraint
    } else {
        format!(" {constraint}")
    };
    let sources = query.sources.join(", ");
    let count = query.count;
    let topic = &query.query;

    format!(
        r#"You are a professional academic research assistant. Your primary goal is to find verifiable information and return it in a structured format.

Find the top {count} most relevant, recent, and highly-cited academic papers on the topic of '{topic}'{constraint}.

You should prioritize results from the following high-authority academic sources: {sources}.

For each paper found, extract the required information and directly return the complete findings as a JSON array that conforms to the provided schema. The JSON should be the only thing you output.

Critical instructions for data extraction:
1.  **Title**: The full, exact title of the paper.
2.  **Authors**: A list of all authors.
3.  **Journal**: The name of the journal or conference.
4.  **Year**: The year of publication.
5.  **URL**: This is critical. You MUST provide a working link. First, try to find the direct, canonical URL to the paper's main page (e.g., on PubMed, arXiv, or a publisher's site). If you cannot verify a direct URL, you MUST construct a Google Search URL for the paper's exact title (e.g., "https://www.google.com/search?q=A+new+method+for+X").
6.  **Abstract**: The complete, verbatim abstract from the paper. You MUST NOT summarize, shorten, or invent an abstract. If the full abstract is not accessible, output the string "Abstract not available".

If no relevant papers are found, return an empty JSON array []."#
    )
}

/// JSON schema the structured answer must follow.
pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": {"type": "STRING"},
                "authors": {"type": "ARRAY", "items": {"type": "STRING"}},
                "journal": {"type": "STRING"},
                "year": {"type": "INTEGER"},
                "abstract": {"type": "STRING"},
                "url": {
                    "type": "STRING",
                    "description": "The direct URL to the paper's page. This field is optional."
                }
            },
            "required": ["title", "authors", "journal", "year", "abstract"]
        }
    })
}

/// Full `generateContent` body for a search.
pub fn search_body(query: &SearchQuery, today: NaiveDate) -> Value {
    json!({
        "contents": [{"role": "user", "parts": [{"text": search_prompt(query, today)}]}],
        "tools": [{"googleSearch": {}}],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

/// Split a search response into papers and grounding sources.
///
/// The two parts are independent: sources come from grounding metadata
/// (entries without a URI are dropped) and papers from the answer text,
/// which must parse as a whole or the search fails.
pub fn parse_search_response(response: &gemini::GeminiResponse) -> Result<SearchResult> {
    let sources = response
        .grounding_chunks()
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .map(|web| SearchSource {
            uri: web.uri.clone().unwrap_or_default(),
            title: web.title.clone().unwrap_or_default(),
        })
        .filter(|source| !source.uri.is_empty())
        .collect();

    let text = response.text();
    let text = match text.trim() {
        "" => "[]",
        trimmed => trimmed,
    };
    let papers: Vec<PaperMetadata> =
        serde_json::from_str(text).map_err(|_| EruditeError::Parse(INVALID_SEARCH_JSON.into()))?;

    Ok(SearchResult { papers, sources })
}

/// Direct search against Gemini using a client-side key.
#[derive(Debug, Clone)]
pub struct GeminiSearch {
    config: EruditeConfig,
}

impl GeminiSearch {
    pub fn new(config: EruditeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SearchBackend for GeminiSearch {
    async fn search(&self, query: &SearchQuery, cancel: &CancellationToken) -> Result<SearchResult> {
        if cancel.is_cancelled() {
            return Err(EruditeError::Aborted);
        }
        let api_key = self
            .config
            .get_api_key(ProviderKey::Gemini)
            .ok_or_else(|| EruditeError::Configuration(SEARCH_KEY_MISSING.into()))?;
        let base_url = self
            .config
            .get_base_url(ProviderKey::Gemini)
            .unwrap_or_else(|| ProviderRegistry::default_base_url(ProviderKey::Gemini).to_string());

        let today = chrono::Local::now().date_naive();
        let body = search_body(query, today);
        debug!(query = %query.query, count = query.count, range = %query.time_range, "searching");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EruditeError::Aborted),
            resp = gemini::generate_content(&base_url, &api_key, SEARCH_MODEL, &body) => resp?,
        };
        if cancel.is_cancelled() {
            return Err(EruditeError::Aborted);
        }

        let result = parse_search_response(&response)?;
        info!(papers = result.papers.len(), sources = result.sources.len(), "search finished");
        Ok(result)
    }
}
