//! Typed provider identifiers.

use strum::{Display, EnumIter, EnumString};

/// Wire family a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    /// Vendor-native streaming call with its own request shape.
    Native,
    /// `POST /chat/completions` with `choices[0].delta.content` deltas.
    ChatCompletions,
    /// `POST /messages` with `content_block_delta` events.
    Messages,
}

/// Canonical provider keys used across model parsing, config, and provider wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKey {
    Gemini,
    #[strum(serialize = "openai")]
    OpenAi,
    #[strum(serialize = "deepseek")]
    DeepSeek,
    Claude,
    Proxy,
}

impl ProviderKey {
    /// Canonical provider key string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Claude => "claude",
            Self::Proxy => "proxy",
        }
    }

    /// Human-facing name used in error messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::OpenAi => "OpenAI",
            Self::DeepSeek => "DeepSeek",
            Self::Claude => "Claude",
            Self::Proxy => "Proxy",
        }
    }

    pub const fn family(self) -> ProviderFamily {
        match self {
            Self::Gemini => ProviderFamily::Native,
            Self::OpenAi | Self::DeepSeek | Self::Proxy => ProviderFamily::ChatCompletions,
            Self::Claude => ProviderFamily::Messages,
        }
    }

    /// Environment variables holding this provider's key, primary first.
    pub const fn env_keys(self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::DeepSeek => &["DEEPSEEK_API_KEY"],
            Self::Claude => &["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"],
            Self::Proxy => &["PROXY_API_KEY"],
        }
    }

    /// Environment variable overriding this provider's base URL.
    pub const fn base_url_env(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_BASE_URL",
            Self::OpenAi => "OPENAI_BASE_URL",
            Self::DeepSeek => "DEEPSEEK_BASE_URL",
            Self::Claude => "CLAUDE_BASE_URL",
            Self::Proxy => "PROXY_BASE_URL",
        }
    }

    /// Parse a provider tag; `None` for anything outside the fixed set.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().to_ascii_lowercase().parse().ok()
    }

    pub fn all() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_tag_round_trip() {
        for key in ProviderKey::all() {
            assert_eq!(ProviderKey::parse(key.as_str()), Some(key));
            assert_eq!(key.to_string(), key.as_str());
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(ProviderKey::parse("mistral"), None);
        assert_eq!(ProviderKey::parse(""), None);
    }

    #[test]
    fn only_gemini_is_native() {
        let native: Vec<_> = ProviderKey::all()
            .filter(|k| k.family() == ProviderFamily::Native)
            .collect();
        assert_eq!(native, vec![ProviderKey::Gemini]);
        assert_eq!(ProviderKey::Claude.family(), ProviderFamily::Messages);
    }
}
