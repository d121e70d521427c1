//! Error types for Erudite.

use thiserror::Error;

/// Primary error type for all Erudite operations.
#[derive(Error, Debug)]
pub enum EruditeError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("{display_name} API key is missing. Set {env_var} or add it with `erudite keys set {provider}`.")]
    MissingApiKey {
        provider: String,
        display_name: String,
        env_var: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API Error: {status} {status_text} - {body}")]
    Api {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Response body is empty.")]
    EmptyBody,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Operation cancelled by user.")]
    Aborted,

    #[error("Error processing paper {source_name}: {message}")]
    ContentExtraction {
        source_name: String,
        message: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Workflow(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Broad error category used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    Parse,
    Cancellation,
    ContentExtraction,
    Input,
    Unknown,
}

impl EruditeError {
    /// Build a transport error from a non-2xx upstream response.
    pub fn api(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Build a content-extraction error for a named source.
    pub fn extraction(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContentExtraction {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownProvider(_) | Self::MissingApiKey { .. } | Self::Configuration(_) => {
                ErrorCategory::Configuration
            }
            Self::Api { .. } | Self::EmptyBody | Self::Network(_) | Self::Stream(_) => {
                ErrorCategory::Transport
            }
            Self::Parse(_) | Self::Serialization(_) => ErrorCategory::Parse,
            Self::Aborted => ErrorCategory::Cancellation,
            Self::ContentExtraction { .. } => ErrorCategory::ContentExtraction,
            Self::InvalidArgument(_) | Self::NotFound(_) | Self::Workflow(_) => {
                ErrorCategory::Input
            }
            Self::Io(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is a user-initiated stop rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<toml::de::Error> for EruditeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EruditeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_embeds_status_text_and_body() {
        let err = EruditeError::api(429, "Too Many Requests", "{\"error\":\"slow down\"}");
        assert_eq!(
            err.to_string(),
            "API Error: 429 Too Many Requests - {\"error\":\"slow down\"}"
        );
        assert_eq!(err.category(), ErrorCategory::Transport);
    }

    #[test]
    fn missing_key_names_the_provider() {
        let err = EruditeError::MissingApiKey {
            provider: "claude".into(),
            display_name: "Claude".into(),
            env_var: "CLAUDE_API_KEY".into(),
        };
        let text = err.to_string();
        assert!(text.starts_with("Claude API key is missing"), "{text}");
        assert!(text.contains("CLAUDE_API_KEY"));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn aborted_is_cancellation_not_failure() {
        assert!(EruditeError::Aborted.is_cancellation());
        assert_eq!(EruditeError::Aborted.category(), ErrorCategory::Cancellation);
        assert!(!EruditeError::EmptyBody.is_cancellation());
    }
}
