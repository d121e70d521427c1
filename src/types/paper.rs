//! Search result records and search parameters.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Sources offered for prioritising search results.
pub const AVAILABLE_SEARCH_SOURCES: &[&str] = &[
    "PubMed",
    "Google Scholar",
    "arXiv",
    "Nature",
    "Science",
    "Cell",
    "Semantic Scholar",
    "bioRxiv",
];

/// Sources selected when the user picks none explicitly.
pub const DEFAULT_SEARCH_SOURCES: &[&str] = &["PubMed", "Google Scholar", "arXiv"];

/// Bibliographic record for one paper found by search. Read-only after the search returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub journal: String,
    pub year: i32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A web page the search model consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub papers: Vec<PaperMetadata>,
    pub sources: Vec<SearchSource>,
}

/// How far back a search may reach.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "all")]
    #[strum(serialize = "all")]
    All,
    #[serde(rename = "month")]
    #[strum(serialize = "month")]
    Month,
    #[serde(rename = "year")]
    #[strum(serialize = "year")]
    Year,
    #[serde(rename = "3year")]
    #[strum(serialize = "3year")]
    ThreeYears,
}

/// Parameters of one literature search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query: String,
    pub count: u32,
    pub time_range: TimeRange,
    #[serde(rename = "sourcesToSearch")]
    pub sources: Vec<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            count: 10,
            time_range: TimeRange::All,
            sources: DEFAULT_SEARCH_SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
