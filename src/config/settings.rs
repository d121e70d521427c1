//! User settings loaded from an optional TOML file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EruditeError;
use crate::models::{ModelSelector, DEFAULT_MODEL};
use crate::prompts::{Language, TemplateType};
use crate::store::default_erudite_dir;
use crate::types::{SamplingConfig, TimeRange, DEFAULT_SEARCH_SOURCES};

/// File name looked up in the working directory.
pub const LOCAL_SETTINGS_FILE: &str = "erudite.toml";

/// Persistent defaults for workflows, search, and the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSelector,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// `None` uses the selected model's default allowance.
    pub max_output_tokens: Option<u32>,
    pub language: Language,
    pub template: TemplateType,
    /// Upper bound on concurrently processed sources in a fan-out.
    pub concurrency: usize,
    pub search: SearchSettings,
    pub relay: RelaySettings,
    /// Provider tag → base URL override.
    pub base_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub count: u32,
    pub time_range: TimeRange,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.6,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: None,
            language: Language::default(),
            template: TemplateType::default(),
            concurrency: 4,
            search: SearchSettings::default(),
            relay: RelaySettings::default(),
            base_urls: HashMap::new(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            count: 10,
            time_range: TimeRange::All,
            sources: DEFAULT_SEARCH_SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

fn default_model() -> ModelSelector {
    ModelSelector::parse(DEFAULT_MODEL)
        .unwrap_or_else(|_| ModelSelector::new(crate::models::ProviderKey::Gemini, "gemini-2.5-pro"))
}

impl Settings {
    /// Parse settings from TOML text. Missing fields take defaults.
    pub fn from_toml(raw: &str) -> Result<Self, EruditeError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, EruditeError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Candidate files in lookup order.
    pub fn search_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(LOCAL_SETTINGS_FILE),
            default_erudite_dir().join("config.toml"),
        ]
    }

    /// Load the first settings file that exists, or defaults when none does.
    pub fn load() -> Result<Self, EruditeError> {
        for path in Self::search_paths() {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading settings");
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Sampling parameters, resolving the token allowance against the model.
    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: Some(
                self.max_output_tokens
                    .unwrap_or_else(|| self.model.default_max_output_tokens()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderKey;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.model.to_string(), "gemini/gemini-2.5-pro");
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.search.count, 10);
        assert_eq!(
            settings.search.sources,
            vec!["PubMed", "Google Scholar", "arXiv"]
        );
        assert_eq!(settings.relay.bind, "127.0.0.1:8787");
    }

    #[test]
    fn partial_file_overrides_fields() {
        let settings = Settings::from_toml(
            r#"
model = "claude/claude-sonnet-4-20250514"
temperature = 0.2
language = "de"
template = "C"

[search]
time_range = "year"

[base_urls]
claude = "http://localhost:9000/v1"
"#,
        )
        .unwrap();
        assert_eq!(settings.model.provider, ProviderKey::Claude);
        assert_eq!(settings.temperature, 0.2);
        assert_eq!(settings.language, Language::De);
        assert_eq!(settings.template, TemplateType::C);
        assert_eq!(settings.search.time_range, TimeRange::Year);
        assert_eq!(settings.search.count, 10);
        assert_eq!(
            settings.base_urls.get("claude").map(String::as_str),
            Some("http://localhost:9000/v1")
        );
    }

    #[test]
    fn unknown_provider_in_model_is_configuration_error() {
        let err = Settings::from_toml(r#"model = "acme/x""#).unwrap_err();
        assert!(matches!(err, EruditeError::Configuration(_)));
    }

    #[test]
    fn sampling_uses_model_default_tokens() {
        let settings = Settings::default();
        assert_eq!(settings.sampling().max_output_tokens, Some(65_536));

        let explicit = Settings {
            max_output_tokens: Some(1000),
            ..Settings::default()
        };
        assert_eq!(explicit.sampling().max_output_tokens, Some(1000));
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("erudite.toml");
        std::fs::write(&path, "concurrency = 2\n").unwrap();
        assert_eq!(Settings::load_from(&path).unwrap().concurrency, 2);
    }
}
