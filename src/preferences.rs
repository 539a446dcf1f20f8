//! Persisted user preferences
//!
//! A tiny string key-value store with the semantics of browser local storage.
//! The chamber only ever touches one key.

use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key holding the chamber on/off preference
pub const ENABLED_KEY: &str = "particlesEnabled";

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Absent or anything other than the literal "false" means enabled
pub fn read_enabled(store: &dyn PreferenceStore) -> bool {
    store.get(ENABLED_KEY).as_deref() != Some("false")
}

/// Best effort: a failed write is logged, never surfaced
pub fn write_enabled(store: &mut dyn PreferenceStore, enabled: bool) {
    let value = if enabled { "true" } else { "false" };
    if let Err(e) = store.set(ENABLED_KEY, value) {
        warn!(error = %e, "failed to persist chamber preference");
    }
}

/// In-memory store (tests, and hosts that don't persist)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk, rewritten on every change
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read(&path) {
            Ok(values) => values,
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable preferences");
                }
                BTreeMap::new()
            },
        };
        debug!(path = %path.display(), entries = values.len(), "opened preferences");
        Self { path, values }
    }

    /// `prefs.json` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "cloudchamber")
            .map(|dirs| dirs.config_dir().join("prefs.json"))
    }

    fn read(path: &Path) -> Result<BTreeMap<String, String>> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_defaults_true() {
        assert!(read_enabled(&MemoryStore::new()));
        assert!(read_enabled(&MemoryStore::new().with(ENABLED_KEY, "true")));
        assert!(read_enabled(&MemoryStore::new().with(ENABLED_KEY, "FALSE")));
        assert!(read_enabled(&MemoryStore::new().with(ENABLED_KEY, "0")));
        assert!(!read_enabled(&MemoryStore::new().with(ENABLED_KEY, "false")));
    }

    #[test]
    fn test_write_enabled_literals() {
        let mut store = MemoryStore::new();
        write_enabled(&mut store, false);
        assert_eq!(store.get(ENABLED_KEY).as_deref(), Some("false"));
        write_enabled(&mut store, true);
        assert_eq!(store.get(ENABLED_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get(ENABLED_KEY), None);
        store.set(ENABLED_KEY, "false").unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(ENABLED_KEY).as_deref(), Some("false"));
    }

    #[test]
    fn test_json_store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert!(read_enabled(&store));
    }
}
