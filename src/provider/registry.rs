//! Lookup table from provider tag to transport route.

use std::fmt;

use super::http::join_url;
use super::wire::{WireProtocol, CHAT_COMPLETIONS, MESSAGES};
use crate::models::{ProviderFamily, ProviderKey};

/// Static description of one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub key: ProviderKey,
    pub default_base_url: &'static str,
    /// Path appended to the base URL (HTTP/SSE family only).
    pub path: &'static str,
}

const PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        key: ProviderKey::Gemini,
        default_base_url: "https://generativelanguage.googleapis.com/v1beta",
        path: "",
    },
    ProviderSpec {
        key: ProviderKey::OpenAi,
        default_base_url: "https://api.openai.com/v1",
        path: "/chat/completions",
    },
    ProviderSpec {
        key: ProviderKey::DeepSeek,
        default_base_url: "https://api.deepseek.com",
        path: "/chat/completions",
    },
    ProviderSpec {
        key: ProviderKey::Proxy,
        default_base_url: "https://api.aiclaude.site/v1",
        path: "/chat/completions",
    },
    ProviderSpec {
        key: ProviderKey::Claude,
        default_base_url: "https://api.anthropic.com/v1",
        path: "/messages",
    },
];

/// Where and how to send an HTTP/SSE request.
#[derive(Clone, Copy)]
pub struct HttpRoute<'a> {
    pub provider: ProviderKey,
    pub base_url: &'a str,
    pub path: &'static str,
    pub wire: &'static dyn WireProtocol,
}

impl HttpRoute<'_> {
    pub fn endpoint(&self) -> String {
        join_url(self.base_url, self.path)
    }
}

impl fmt::Debug for HttpRoute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRoute")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint())
            .field("wire", &self.wire.name())
            .finish()
    }
}

/// Native-SDK marker versus data-driven HTTP/SSE route.
#[derive(Debug, Clone, Copy)]
pub enum ProviderRoute<'a> {
    Native { base_url: &'a str },
    Http(HttpRoute<'a>),
}

/// Resolves providers to routes, honouring base-URL overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderRegistry;

impl ProviderRegistry {
    pub fn spec(provider: ProviderKey) -> &'static ProviderSpec {
        PROVIDERS
            .iter()
            .find(|spec| spec.key == provider)
            .unwrap_or(&PROVIDERS[0])
    }

    pub fn default_base_url(provider: ProviderKey) -> &'static str {
        Self::spec(provider).default_base_url
    }

    /// Route for `provider`; `base_url` replaces the default when given.
    pub fn route<'a>(provider: ProviderKey, base_url: Option<&'a str>) -> ProviderRoute<'a> {
        let spec = Self::spec(provider);
        let base_url = base_url.unwrap_or(spec.default_base_url);
        let wire: &'static dyn WireProtocol = match provider.family() {
            ProviderFamily::Native => return ProviderRoute::Native { base_url },
            ProviderFamily::ChatCompletions => &CHAT_COMPLETIONS,
            ProviderFamily::Messages => &MESSAGES,
        };
        ProviderRoute::Http(HttpRoute {
            provider,
            base_url,
            path: spec.path,
            wire,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(provider: ProviderKey) -> String {
        match ProviderRegistry::route(provider, None) {
            ProviderRoute::Http(route) => route.endpoint(),
            ProviderRoute::Native { .. } => panic!("{provider} is native"),
        }
    }

    #[test]
    fn default_endpoints() {
        assert_eq!(
            endpoint(ProviderKey::OpenAi),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            endpoint(ProviderKey::DeepSeek),
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(
            endpoint(ProviderKey::Proxy),
            "https://api.aiclaude.site/v1/chat/completions"
        );
        assert_eq!(
            endpoint(ProviderKey::Claude),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn gemini_is_native() {
        assert!(matches!(
            ProviderRegistry::route(ProviderKey::Gemini, None),
            ProviderRoute::Native { base_url } if base_url.contains("generativelanguage")
        ));
    }

    #[test]
    fn override_replaces_base_url_and_picks_wire() {
        match ProviderRegistry::route(ProviderKey::Claude, Some("http://127.0.0.1:9/v1/")) {
            ProviderRoute::Http(route) => {
                assert_eq!(route.endpoint(), "http://127.0.0.1:9/v1/messages");
                assert_eq!(route.wire.name(), "messages");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn every_provider_has_a_spec() {
        for key in ProviderKey::all() {
            assert_eq!(ProviderRegistry::spec(key).key, key);
        }
    }
}
