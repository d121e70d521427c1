//! Locally persisted user preferences (API keys, custom templates).
//!
//! A flat string-keyed store of JSON values. There is no schema versioning:
//! an absent key means "use the default".

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EruditeError;

/// Store key holding custom prompt templates (template id → text).
pub const CUSTOM_TEMPLATES_KEY: &str = "erudite-custom-templates";
/// Store key holding provider API keys (provider tag → secret).
pub const API_KEYS_KEY: &str = "erudite-api-keys";

/// Key-value persistence for preferences.
pub trait PreferenceStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, EruditeError>;
    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), EruditeError>;
    fn clear(&self, key: &str) -> Result<(), EruditeError>;
}

/// Typed helpers over any [`PreferenceStore`].
pub trait PreferenceStoreExt: PreferenceStore {
    /// Load and deserialize a value; unparsable data reads as absent.
    fn load_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, EruditeError> {
        Ok(self
            .load(key)?
            .and_then(|value| serde_json::from_value(value).ok()))
    }

    fn save_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), EruditeError> {
        self.save(key, &serde_json::to_value(value)?)
    }

    /// Saved provider API keys.
    fn api_keys(&self) -> Result<HashMap<String, String>, EruditeError> {
        Ok(self.load_as(API_KEYS_KEY)?.unwrap_or_default())
    }

    /// Saved custom templates.
    fn custom_templates(&self) -> Result<HashMap<String, String>, EruditeError> {
        Ok(self.load_as(CUSTOM_TEMPLATES_KEY)?.unwrap_or_default())
    }
}

impl<S: PreferenceStore + ?Sized> PreferenceStoreExt for S {}

/// One `<key>.json` file per key under a base directory.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    base_dir: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store rooted at `~/.erudite`.
    pub fn new_default() -> Self {
        Self::new(default_erudite_dir())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", normalize_label(key)))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, EruditeError> {
        let path = self.value_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable preference file");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), EruditeError> {
        let path = self.value_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), EruditeError> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store, used by tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, EruditeError> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), EruditeError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), EruditeError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

pub(crate) fn default_erudite_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".erudite"))
        .unwrap_or_else(|| PathBuf::from(".erudite"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FilePreferenceStore) {
        let dir = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn file_store_round_trip() {
        let (_dir, store) = temp_store();
        store
            .save(API_KEYS_KEY, &json!({"openai": "sk-test"}))
            .unwrap();
        let keys = store.api_keys().unwrap();
        assert_eq!(keys.get("openai").map(String::as_str), Some("sk-test"));
    }

    #[test]
    fn absent_key_is_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load(CUSTOM_TEMPLATES_KEY).unwrap(), None);
        assert!(store.custom_templates().unwrap().is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let (_dir, store) = temp_store();
        store.save("k", &json!(1)).unwrap();
        store.clear("k").unwrap();
        store.clear("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let (dir, store) = temp_store();
        std::fs::write(dir.path().join("erudite-api-keys.json"), "{not json").unwrap();
        assert_eq!(store.load(API_KEYS_KEY).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, store) = temp_store();
        store.save(API_KEYS_KEY, &json!({})).unwrap();
        let meta = std::fs::metadata(dir.path().join("erudite-api-keys.json")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn memory_store_typed_helpers() {
        let store = MemoryPreferenceStore::new();
        let mut templates = HashMap::new();
        templates.insert("A".to_string(), "custom A".to_string());
        store.save_as(CUSTOM_TEMPLATES_KEY, &templates).unwrap();
        assert_eq!(store.custom_templates().unwrap(), templates);
    }

    #[test]
    fn normalize_label_maps_odd_characters() {
        assert_eq!(normalize_label("  "), "default");
        assert_eq!(normalize_label("My Key!"), "my-key-");
    }
}
