//! Configuration system (layered: code > env > preference store, plus a TOML settings file).

pub mod settings;

pub use settings::{RelaySettings, SearchSettings, Settings};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use crate::models::ProviderKey;
use crate::store::{PreferenceStore, PreferenceStoreExt};

/// Global default config (lazy-initialized from env).
static DEFAULT_CONFIG: OnceLock<EruditeConfig> = OnceLock::new();

/// Injected API-key lookup used by the generation façade.
///
/// Implementations return whatever they hold; empty or whitespace-only values
/// are treated as missing by callers.
pub trait KeyLookup: Send + Sync {
    fn api_key(&self, provider: ProviderKey) -> Option<String>;
}

impl KeyLookup for HashMap<ProviderKey, String> {
    fn api_key(&self, provider: ProviderKey) -> Option<String> {
        self.get(&provider).cloned()
    }
}

/// Layered configuration for Erudite.
///
/// Resolution order for API keys:
/// 1. Explicit keys (from env vars or `set_api_key`)
/// 2. Keys saved in the preference store (`erudite keys set`)
#[derive(Clone)]
pub struct EruditeConfig {
    api_keys: Arc<RwLock<HashMap<ProviderKey, String>>>,
    base_urls: Arc<RwLock<HashMap<ProviderKey, String>>>,
    store: Option<Arc<dyn PreferenceStore>>,
}

impl fmt::Debug for EruditeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<ProviderKey> = self
            .api_keys
            .read()
            .map(|keys| keys.keys().copied().collect())
            .unwrap_or_default();
        f.debug_struct("EruditeConfig")
            .field("api_keys", &providers)
            .field("base_urls", &self.base_urls)
            .field("store", &self.store.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Default for EruditeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EruditeConfig {
    /// Create an empty config with no preference-store fallback.
    pub fn new() -> Self {
        Self {
            api_keys: Arc::new(RwLock::new(HashMap::new())),
            base_urls: Arc::new(RwLock::new(HashMap::new())),
            store: None,
        }
    }

    /// Attach a preference store consulted after explicit keys.
    pub fn with_store(mut self, store: Option<Arc<dyn PreferenceStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> Option<&Arc<dyn PreferenceStore>> {
        self.store.as_ref()
    }

    /// Load from environment variables (GEMINI_API_KEY, OPENAI_API_KEY, etc.).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let config = Self::new();

        for provider in ProviderKey::all() {
            // Primary variable wins over aliases.
            if let Some(key) = provider
                .env_keys()
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            {
                config.set_api_key(provider, key);
            }
            if let Ok(url) = std::env::var(provider.base_url_env()) {
                config.set_base_url(provider, url);
            }
        }

        config
    }

    /// Get (or create) the global default config.
    pub fn global() -> &'static EruditeConfig {
        DEFAULT_CONFIG.get_or_init(Self::from_env)
    }

    /// Apply base-URL overrides from a settings file without clobbering
    /// overrides already set from code or env.
    pub fn apply_settings(&self, settings: &Settings) {
        for (tag, url) in &settings.base_urls {
            let Some(provider) = ProviderKey::parse(tag) else {
                tracing::warn!(provider = %tag, "ignoring base URL for unknown provider");
                continue;
            };
            if self.get_base_url(provider).is_none() {
                self.set_base_url(provider, url.clone());
            }
        }
    }

    pub fn set_api_key(&self, provider: ProviderKey, key: impl Into<String>) {
        self.api_keys
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(provider, key.into());
    }

    /// Resolve an API key for a provider.
    ///
    /// Checks explicit keys first, then falls back to keys saved in the
    /// preference store. Blank values are skipped at every layer.
    pub fn get_api_key(&self, provider: ProviderKey) -> Option<String> {
        let explicit = self
            .api_keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&provider)
            .cloned();
        if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
            return Some(key);
        }

        let store = self.store.as_ref()?;
        match store.api_keys() {
            Ok(saved) => saved
                .get(provider.as_str())
                .filter(|k| !k.trim().is_empty())
                .cloned(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read saved API keys");
                None
            }
        }
    }

    pub fn set_base_url(&self, provider: ProviderKey, url: impl Into<String>) {
        self.base_urls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(provider, url.into());
    }

    pub fn get_base_url(&self, provider: ProviderKey) -> Option<String> {
        self.base_urls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&provider)
            .cloned()
    }

    /// Check if a provider has a usable key at any layer.
    pub fn has_credentials(&self, provider: ProviderKey) -> bool {
        self.get_api_key(provider).is_some()
    }
}

impl KeyLookup for EruditeConfig {
    fn api_key(&self, provider: ProviderKey) -> Option<String> {
        self.get_api_key(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryPreferenceStore, API_KEYS_KEY};
    use serde_json::json;

    fn config_with_saved_keys(saved: serde_json::Value) -> EruditeConfig {
        let store = MemoryPreferenceStore::new();
        store.save(API_KEYS_KEY, &saved).unwrap();
        EruditeConfig::new().with_store(Some(Arc::new(store)))
    }

    #[test]
    fn get_api_key_falls_back_to_store() {
        let config = config_with_saved_keys(json!({"deepseek": "ds-saved"}));
        assert_eq!(
            config.get_api_key(ProviderKey::DeepSeek),
            Some("ds-saved".to_string())
        );
    }

    #[test]
    fn explicit_key_takes_precedence_over_store() {
        let config = config_with_saved_keys(json!({"openai": "saved"}));
        config.set_api_key(ProviderKey::OpenAi, "explicit");
        assert_eq!(
            config.get_api_key(ProviderKey::OpenAi),
            Some("explicit".to_string())
        );
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let config = config_with_saved_keys(json!({"claude": "   "}));
        config.set_api_key(ProviderKey::Claude, "");
        assert_eq!(config.get_api_key(ProviderKey::Claude), None);
        assert!(!config.has_credentials(ProviderKey::Claude));
    }

    #[test]
    fn config_without_store_returns_none_for_missing_key() {
        assert_eq!(EruditeConfig::new().get_api_key(ProviderKey::Gemini), None);
    }

    #[test]
    fn settings_base_urls_do_not_override_explicit_ones() {
        let config = EruditeConfig::new();
        config.set_base_url(ProviderKey::OpenAi, "http://explicit");
        let mut settings = Settings::default();
        settings
            .base_urls
            .insert("openai".into(), "http://from-file".into());
        settings
            .base_urls
            .insert("claude".into(), "http://claude-file".into());
        settings.base_urls.insert("nope".into(), "http://x".into());
        config.apply_settings(&settings);

        assert_eq!(
            config.get_base_url(ProviderKey::OpenAi).as_deref(),
            Some("http://explicit")
        );
        assert_eq!(
            config.get_base_url(ProviderKey::Claude).as_deref(),
            Some("http://claude-file")
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = EruditeConfig::new();
        config.set_api_key(ProviderKey::Proxy, "super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("Proxy"));
    }
}
