//! Tests for configuration system.

use std::sync::{Arc, Mutex, OnceLock};

use erudite::config::{EruditeConfig, Settings};
use erudite::models::ProviderKey;
use erudite::prompts::{Language, TemplateType};
use erudite::store::{FilePreferenceStore, PreferenceStoreExt, API_KEYS_KEY};
use erudite::types::TimeRange;
use pretty_assertions::assert_eq;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 12] = [
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "OPENAI_API_KEY",
    "DEEPSEEK_API_KEY",
    "CLAUDE_API_KEY",
    "ANTHROPIC_API_KEY",
    "PROXY_API_KEY",
    "GEMINI_BASE_URL",
    "OPENAI_BASE_URL",
    "DEEPSEEK_BASE_URL",
    "CLAUDE_BASE_URL",
    "PROXY_BASE_URL",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clean_env() -> EnvGuard {
    let guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    guard
}

#[test]
fn config_set_get_api_key() {
    let config = EruditeConfig::new();
    config.set_api_key(ProviderKey::OpenAi, "sk-test-123");
    assert_eq!(
        config.get_api_key(ProviderKey::OpenAi),
        Some("sk-test-123".to_string())
    );
    assert_eq!(config.get_api_key(ProviderKey::Claude), None);
}

#[test]
fn config_blank_key_counts_as_missing() {
    let config = EruditeConfig::new();
    config.set_api_key(ProviderKey::DeepSeek, "   ");
    assert!(!config.has_credentials(ProviderKey::DeepSeek));
}

#[test]
fn config_set_get_base_url() {
    let config = EruditeConfig::new();
    config.set_base_url(ProviderKey::Proxy, "http://localhost:8080/v1");
    assert_eq!(
        config.get_base_url(ProviderKey::Proxy),
        Some("http://localhost:8080/v1".to_string())
    );
}

#[test]
fn config_from_env_maps_api_keys_and_base_urls() {
    let _env_lock = env_lock_guard();
    let _env_guard = clean_env();

    std::env::set_var("OPENAI_API_KEY", "test-openai-key");
    std::env::set_var("CLAUDE_API_KEY", "test-claude-key");
    std::env::set_var("OPENAI_BASE_URL", "http://localhost:9999/v1");

    let config = EruditeConfig::from_env();

    assert_eq!(
        config.get_api_key(ProviderKey::OpenAi),
        Some("test-openai-key".to_string())
    );
    assert_eq!(
        config.get_api_key(ProviderKey::Claude),
        Some("test-claude-key".to_string())
    );
    assert_eq!(
        config.get_base_url(ProviderKey::OpenAi),
        Some("http://localhost:9999/v1".to_string())
    );
    assert_eq!(config.get_api_key(ProviderKey::Proxy), None);
}

#[test]
fn config_from_env_prefers_primary_variable_over_alias() {
    let _env_lock = env_lock_guard();
    let _env_guard = clean_env();

    std::env::set_var("GOOGLE_API_KEY", "google-key");
    std::env::set_var("GEMINI_API_KEY", "gemini-key");
    std::env::set_var("ANTHROPIC_API_KEY", "anthropic-key");

    let config = EruditeConfig::from_env();

    assert_eq!(
        config.get_api_key(ProviderKey::Gemini),
        Some("gemini-key".to_string())
    );
    assert_eq!(
        config.get_api_key(ProviderKey::Claude),
        Some("anthropic-key".to_string())
    );
}

#[test]
fn env_keys_win_over_saved_keys() {
    let _env_lock = env_lock_guard();
    let _env_guard = clean_env();
    std::env::set_var("OPENAI_API_KEY", "from-env");

    let dir = tempfile::tempdir().unwrap();
    let store = FilePreferenceStore::new(dir.path());
    store
        .save_as(
            API_KEYS_KEY,
            &serde_json::json!({"openai": "saved-openai", "deepseek": "saved-deepseek"}),
        )
        .unwrap();

    let config = EruditeConfig::from_env().with_store(Some(Arc::new(store)));
    assert_eq!(
        config.get_api_key(ProviderKey::OpenAi),
        Some("from-env".to_string())
    );
    assert_eq!(
        config.get_api_key(ProviderKey::DeepSeek),
        Some("saved-deepseek".to_string())
    );
}

#[test]
fn settings_file_overrides_only_named_fields() {
    let settings = Settings::from_toml(
        r#"
model = "deepseek/deepseek-chat"
temperature = 0.3
language = "zh"
template = "D"

[search]
time_range = "3year"

[base_urls]
deepseek = "http://127.0.0.1:4000"
"#,
    )
    .unwrap();

    assert_eq!(settings.model.to_string(), "deepseek/deepseek-chat");
    assert_eq!(settings.temperature, 0.3);
    assert_eq!(settings.top_k, 64);
    assert_eq!(settings.language, Language::Zh);
    assert_eq!(settings.template, TemplateType::D);
    assert_eq!(settings.search.time_range, TimeRange::ThreeYears);
    assert_eq!(settings.search.count, 10);
    assert_eq!(settings.concurrency, 4);

    let config = EruditeConfig::new();
    config.apply_settings(&settings);
    assert_eq!(
        config.get_base_url(ProviderKey::DeepSeek),
        Some("http://127.0.0.1:4000".to_string())
    );
}

#[test]
fn settings_base_url_does_not_clobber_explicit_override() {
    let settings = Settings::from_toml("[base_urls]\nclaude = \"http://file\"\n").unwrap();
    let config = EruditeConfig::new();
    config.set_base_url(ProviderKey::Claude, "http://code");
    config.apply_settings(&settings);
    assert_eq!(
        config.get_base_url(ProviderKey::Claude),
        Some("http://code".to_string())
    );
}

#[test]
fn settings_defaults_match_documented_values() {
    let settings = Settings::default();
    assert_eq!(settings.model.to_string(), "gemini/gemini-2.5-pro");
    assert_eq!(settings.sampling().max_output_tokens, Some(65_536));
    assert_eq!(settings.top_p, 0.95);
    assert_eq!(settings.relay.bind, "127.0.0.1:8787");
    assert_eq!(
        settings.search.sources,
        vec!["PubMed", "Google Scholar", "arXiv"]
    );
}

#[test]
fn invalid_settings_toml_is_a_configuration_error() {
    let err = Settings::from_toml("model = [").unwrap_err();
    assert_eq!(
        err.category(),
        erudite::error::ErrorCategory::Configuration
    );
}
