//! CLI key command handlers for set, list, and clear.

use crate::config::EruditeConfig;
use crate::error::{EruditeError, Result};
use crate::models::ProviderKey;
use crate::store::{PreferenceStore, PreferenceStoreExt, API_KEYS_KEY};

fn provider_tag(raw: &str) -> Result<ProviderKey> {
    ProviderKey::parse(raw).ok_or_else(|| EruditeError::UnknownProvider(raw.to_string()))
}

/// Handle `erudite keys set <provider> <key>`.
pub fn handle_set(store: &dyn PreferenceStore, provider: &str, key: &str) -> Result<()> {
    let provider = provider_tag(provider)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(EruditeError::InvalidArgument("API key must not be empty".into()));
    }
    let mut keys = store.api_keys()?;
    keys.insert(provider.as_str().to_string(), key.to_string());
    store.save_as(API_KEYS_KEY, &keys)?;
    println!("✅ Saved {} API key", provider.display_name());
    Ok(())
}

/// Handle `erudite keys list`.
pub fn handle_list(store: &dyn PreferenceStore) -> Result<()> {
    for line in key_status_lines(store)? {
        println!("{line}");
    }
    Ok(())
}

/// Handle `erudite keys clear [provider]`.
pub fn handle_clear(store: &dyn PreferenceStore, provider: Option<&str>) -> Result<()> {
    match provider {
        None => {
            store.clear(API_KEYS_KEY)?;
            println!("🗑️  Removed all saved API keys");
        }
        Some(raw) => {
            let provider = provider_tag(raw)?;
            let mut keys = store.api_keys()?;
            if keys.remove(provider.as_str()).is_some() {
                store.save_as(API_KEYS_KEY, &keys)?;
                println!("🗑️  Removed {} API key", provider.display_name());
            } else {
                println!("No saved {} API key", provider.display_name());
            }
        }
    }
    Ok(())
}

/// One status line per provider, env keys taking precedence over saved ones.
pub fn key_status_lines(store: &dyn PreferenceStore) -> Result<Vec<String>> {
    let env = EruditeConfig::from_env();
    let saved = store.api_keys()?;
    Ok(ProviderKey::all()
        .map(|provider| {
            let status = match (
                env.get_api_key(provider),
                saved.get(provider.as_str()).filter(|k| !k.trim().is_empty()),
            ) {
                (Some(key), _) => format!("{} (env)", mask(&key)),
                (None, Some(key)) => format!("{} (saved)", mask(key)),
                (None, None) => "not set".to_string(),
            };
            format!("{:<10} {status}", provider.as_str())
        })
        .collect())
}

/// Show only the last four characters.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FilePreferenceStore;

    #[test]
    fn set_and_clear_round_trip_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path());

        handle_set(&store, "DeepSeek", " sk-abc ").unwrap();
        assert_eq!(store.api_keys().unwrap()["deepseek"], "sk-abc");

        handle_clear(&store, Some("deepseek")).unwrap();
        assert!(store.api_keys().unwrap().is_empty());
    }

    #[test]
    fn clear_without_provider_drops_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path());
        handle_set(&store, "openai", "sk-1").unwrap();
        handle_set(&store, "claude", "sk-2").unwrap();

        handle_clear(&store, None).unwrap();
        assert!(store.api_keys().unwrap().is_empty());
    }

    #[test]
    fn unknown_provider_and_blank_key_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path());
        assert!(matches!(
            handle_set(&store, "mistral", "k"),
            Err(EruditeError::UnknownProvider(_))
        ));
        assert!(matches!(
            handle_set(&store, "openai", "   "),
            Err(EruditeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask("sk-1234567890"), "****7890");
        assert_eq!(mask("abc"), "****");
    }

    #[test]
    fn status_lists_every_provider() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path());
        let lines = key_status_lines(&store).unwrap();
        assert_eq!(lines.len(), ProviderKey::all().count());
        assert!(lines.iter().any(|l| l.starts_with("proxy")));
    }
}
