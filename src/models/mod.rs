//! Provider keys, model selectors, and the built-in model catalog.

pub mod provider_key;
pub mod selector;

pub use provider_key::{ProviderFamily, ProviderKey};
pub use selector::ModelSelector;

/// A catalog entry shown to users when picking a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogModel {
    pub id: &'static str,
    pub name: &'static str,
}

const fn entry(id: &'static str, name: &'static str) -> CatalogModel {
    CatalogModel { id, name }
}

/// Known models per provider. Selection is not restricted to this list.
pub const CATALOG: &[(ProviderKey, &[CatalogModel])] = &[
    (
        ProviderKey::OpenAi,
        &[
            entry("openai/gpt-4o-2024-08-06", "GPT-4o"),
            entry("openai/gpt-4.1-2025-04-14", "GPT-4.1"),
            entry("openai/o3-2025-04-16", "o3"),
            entry("openai/gpt-4o-mini-2024-07-18", "GPT-4o mini"),
            entry("openai/gpt-4.1-nano-2025-04-14", "GPT-4.1 nano"),
        ],
    ),
    (
        ProviderKey::Gemini,
        &[
            entry("gemini/gemini-2.5-pro", "Gemini 2.5 Pro"),
            entry("gemini/gemini-2.5-flash", "Gemini 2.5 Flash"),
            entry("gemini/gemini-2.0-flash-thinking", "Gemini 2.0 Flash Thinking"),
            entry("gemini/gemini-2.0-flash-lite", "Gemini 2.0 Flash-Lite"),
        ],
    ),
    (
        ProviderKey::Claude,
        &[
            entry("claude/claude-opus-4-20250514", "Claude Opus 4"),
            entry("claude/claude-sonnet-4-20250514", "Claude Sonnet 4"),
            entry("claude/claude-3-5-haiku-20241022", "Claude Haiku 3.5"),
            entry("claude/claude-3-haiku-20240307", "Claude 3 Haiku"),
        ],
    ),
    (
        ProviderKey::DeepSeek,
        &[
            entry("deepseek/deepseek-reasoner", "DeepSeek-R1"),
            entry("deepseek/deepseek-chat", "DeepSeek-V3"),
        ],
    ),
    (
        ProviderKey::Proxy,
        &[
            entry("proxy/claude-3-5-sonnet-20240620", "Claude 3.5 Sonnet (Proxy)"),
            entry("proxy/gemini-2.5-flash", "Gemini 2.5 Flash (Proxy)"),
            entry("proxy/deepseek-chat", "DeepSeek Chat (Proxy)"),
        ],
    ),
];

/// Default model when nothing is configured.
pub const DEFAULT_MODEL: &str = "gemini/gemini-2.5-pro";

/// Model used by the literature search call.
pub const SEARCH_MODEL: &str = "gemini-2.5-flash";
