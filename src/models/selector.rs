//! Model selection and parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ProviderKey;
use crate::error::EruditeError;

/// A `provider/model-name` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSelector {
    pub provider: ProviderKey,
    pub model_name: String,
}

impl ModelSelector {
    pub fn new(provider: ProviderKey, model_name: impl Into<String>) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
        }
    }

    /// Parse `"provider/model_name"`.
    ///
    /// Examples: `"gemini/gemini-2.5-pro"`, `"claude/claude-sonnet-4-20250514"`.
    /// Only the first slash separates the provider, so model names may contain
    /// slashes of their own.
    pub fn parse(s: &str) -> Result<Self, EruditeError> {
        let (provider, model_name) = s.split_once('/').ok_or_else(|| {
            EruditeError::InvalidArgument(format!(
                "Invalid model selector '{s}': expected 'provider/model-name'"
            ))
        })?;
        let provider = ProviderKey::parse(provider)
            .ok_or_else(|| EruditeError::UnknownProvider(provider.to_string()))?;
        if model_name.trim().is_empty() {
            return Err(EruditeError::InvalidArgument(format!(
                "Invalid model selector '{s}': empty model name"
            )));
        }
        Ok(Self::new(provider, model_name.trim()))
    }

    /// Default max-output-token allowance for this model.
    pub fn default_max_output_tokens(&self) -> u32 {
        match (self.provider, self.model_name.as_str()) {
            (ProviderKey::Gemini, "gemini-2.5-pro") => 65_536,
            (ProviderKey::Gemini, "gemini-2.5-flash") => 8_192,
            (ProviderKey::OpenAi, name) if name.starts_with("gpt-4") => 128_000,
            _ => 16_385,
        }
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model_name)
    }
}

impl FromStr for ModelSelector {
    type Err = EruditeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ModelSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
