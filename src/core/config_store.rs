//! # Config Store
//!
//! Loads, caches and persists `.nrun.json` documents. A `ConfigStore` is owned by the
//! run context, so every component asking for the same file during one run gets the
//! same parsed document without touching the disk again.
//!
//! Writes are plain overwrites (no fsync, no atomic rename). Mutating commands go
//! through [`ConfigStore::update`], which copies the file to `<path>.bak` first and
//! refuses to write when that copy fails.

use crate::constants::BACKUP_SUFFIX;
use crate::models::ConfigDocument;
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file does not exist. Callers treat this as "use empty defaults".
    #[error("Configuration file '{path}' not found.")]
    NotFound { path: String },
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration file '{path}' is not valid JSON: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Failed to write configuration file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to back up '{path}' to '{backup}': {source}")]
    Backup {
        path: String,
        backup: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// In-process cache of configuration documents, keyed by the path they were read from.
#[derive(Debug, Default)]
pub struct ConfigStore {
    cache: HashMap<PathBuf, ConfigDocument>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the document at `path`, reading and caching it on first access.
    pub fn read(&mut self, path: &Path) -> Result<&ConfigDocument, ConfigError> {
        if !self.cache.contains_key(path) {
            let document = load_document(path)?;
            log::debug!("Loaded configuration from '{}'.", path.display());
            self.cache.insert(path.to_path_buf(), document);
        }
        self.cache
            .get(path)
            .ok_or_else(|| ConfigError::NotFound {
                path: path.display().to_string(),
            })
    }

    /// Like [`read`](Self::read), but a missing file yields `None` and any other
    /// failure is logged and treated as an absent layer.
    pub fn read_layer(&mut self, path: &Path) -> Option<ConfigDocument> {
        match self.read(path) {
            Ok(document) => Some(document.clone()),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                log::warn!("Skipping configuration layer: {}", e);
                None
            }
        }
    }

    /// Serializes `document` with two-space indentation, overwrites `path` and
    /// refreshes the cache entry.
    pub fn write(&mut self, path: &Path, document: ConfigDocument) -> Result<(), ConfigError> {
        let mut json = serde_json::to_string_pretty(&document).map_err(ConfigError::Serialize)?;
        json.push('\n');
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        self.cache.insert(path.to_path_buf(), document);
        Ok(())
    }

    /// Applies `mutate` to the document at `path` and persists the result.
    ///
    /// A missing file starts from an empty document. A malformed one aborts, so a
    /// file the user can still repair is never overwritten. When the mutation
    /// leaves the document unchanged nothing is written.
    pub fn update<T>(
        &mut self,
        path: &Path,
        mutate: impl FnOnce(&mut ConfigDocument) -> T,
    ) -> Result<T, ConfigError> {
        let original = match self.read(path) {
            Ok(document) => document.clone(),
            Err(e) if e.is_not_found() => ConfigDocument::default(),
            Err(e) => return Err(e),
        };

        let mut updated = original.clone();
        let outcome = mutate(&mut updated);
        if updated == original {
            log::debug!("Configuration '{}' unchanged, not writing.", path.display());
            return Ok(outcome);
        }

        if let Some(backup) = backup_file(path)? {
            log::debug!("Backed up '{}' to '{}'.", path.display(), backup.display());
        }
        self.write(path, updated)?;
        Ok(outcome)
    }
}

/// Returns the path of the backup copy for `path` (`<path>.bak`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copies `path` to `<path>.bak`. Returns `None` when there is nothing to back up.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|source| ConfigError::Backup {
        path: path.display().to_string(),
        backup: backup.display().to_string(),
        source,
    })?;
    Ok(Some(backup))
}

fn load_document(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };
    decode_document(&content).map_err(|source| ConfigError::Malformed {
        path: path.display().to_string(),
        source,
    })
}

/// Decodes a document, falling back to a field-by-field decode when the file is
/// valid JSON but some fields have an unexpected shape. Those fields are ignored for
/// resolution but kept raw in `extra`, so a rewrite of the file preserves them.
fn decode_document(content: &str) -> Result<ConfigDocument, serde_json::Error> {
    let full_error = match serde_json::from_str::<ConfigDocument>(content) {
        Ok(document) => return Ok(document),
        Err(e) => e,
    };

    let Value::Object(fields) = serde_json::from_str::<Value>(content)? else {
        return Err(full_error);
    };

    let mut kept = serde_json::Map::new();
    let mut misshaped = Vec::new();
    for (key, value) in fields {
        let mut single = serde_json::Map::new();
        single.insert(key.clone(), value.clone());
        match serde_json::from_value::<ConfigDocument>(Value::Object(single)) {
            Ok(_) => {
                kept.insert(key, value);
            }
            Err(e) => {
                log::warn!("Ignoring configuration field '{}': {}", key, e);
                misshaped.push((key, value));
            }
        }
    }
    let mut document: ConfigDocument = serde_json::from_value(Value::Object(kept))?;
    document.extra.extend(misshaped);
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut store = ConfigStore::new();
        let err = store.read(&dir.path().join(".nrun.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_is_cached_per_path() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        fs::write(&path, r#"{"vars": {"a": "1"}}"#).unwrap();
        let mut store = ConfigStore::new();

        // --- Execute ---
        let first = store.read(&path).unwrap().clone();
        fs::write(&path, r#"{"vars": {"a": "2"}}"#).unwrap();
        let second = store.read(&path).unwrap().clone();

        // --- Assert ---
        assert_eq!(first.vars.get("a").map(String::as_str), Some("1"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_and_missing_fields() {
        let doc = decode_document(r#"{"future": {"x": 1}, "projects": {"web": "/srv/web"}}"#)
            .unwrap();
        assert!(doc.env.is_empty());
        assert!(doc.scripts.is_empty());
        assert_eq!(doc.projects.get("web").map(String::as_str), Some("/srv/web"));
        assert!(doc.extra.contains_key("future"));
    }

    #[test]
    fn test_partial_decode_drops_bad_fields_only() {
        let doc = decode_document(r#"{"vars": ["not", "a", "map"], "alias": {"ll": "ls -l"}}"#)
            .unwrap();
        assert!(doc.vars.is_empty());
        assert_eq!(doc.alias.get("ll").map(String::as_str), Some("ls -l"));
        assert!(doc.extra.contains_key("vars"));
    }

    #[test]
    fn test_update_keeps_misshaped_fields() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        fs::write(&path, r#"{"vars": ["keep", "me"], "alias": {"ll": "ls -l"}}"#).unwrap();
        let mut store = ConfigStore::new();

        // --- Execute ---
        store
            .update(&path, |doc| {
                doc.projects.insert("web".to_string(), "/srv/web".to_string());
            })
            .unwrap();

        // --- Assert ---
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["vars"], serde_json::json!(["keep", "me"]));
        assert_eq!(written["alias"]["ll"], "ls -l");
        assert_eq!(written["projects"]["web"], "/srv/web");
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        fs::write(&path, "{ this is not json").unwrap();
        let mut store = ConfigStore::new();
        assert!(matches!(store.read(&path), Err(ConfigError::Malformed { .. })));
        assert!(store.read_layer(&path).is_none());
    }

    #[test]
    fn test_package_json_override_accepts_both_key_spellings() {
        let legacy = decode_document(r#"{"package.json": {"*": {"scripts": {}}}}"#).unwrap();
        let named = decode_document(r#"{"packageJSONOverride": {"*": {"scripts": {}}}}"#).unwrap();
        assert!(legacy.package_json_override.contains_key("*"));
        assert!(named.package_json_override.contains_key("*"));
    }

    #[test]
    fn test_write_is_indented_and_updates_cache() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        let mut store = ConfigStore::new();
        let mut doc = ConfigDocument::default();
        doc.projects.insert("web".to_string(), "/srv/web".to_string());

        // --- Execute ---
        store.write(&path, doc.clone()).unwrap();

        // --- Assert ---
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"projects\": {\n    \"web\": \"/srv/web\"\n  }"));
        assert_eq!(store.read(&path).unwrap(), &doc);
    }

    #[test]
    fn test_update_backs_up_before_writing() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        let original = r#"{"scripts": {"build": ["make"]}}"#;
        fs::write(&path, original).unwrap();
        let mut store = ConfigStore::new();

        // --- Execute ---
        store
            .update(&path, |doc| {
                doc.scripts.remove("build");
            })
            .unwrap();

        // --- Assert ---
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), original);
        let reread = decode_document(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(reread.scripts.is_empty());
    }

    #[test]
    fn test_update_without_changes_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        fs::write(&path, r#"{"vars": {"a": "1"}}"#).unwrap();
        let mut store = ConfigStore::new();

        store.update(&path, |_| ()).unwrap();

        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_update_aborts_when_backup_fails() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        let original = r#"{"projects": {"a": "/a"}}"#;
        fs::write(&path, original).unwrap();
        // A directory where the backup file should go makes the copy fail.
        fs::create_dir(backup_path(&path)).unwrap();
        let mut store = ConfigStore::new();

        // --- Execute ---
        let result = store.update(&path, |doc| {
            doc.projects.clear();
        });

        // --- Assert ---
        assert!(matches!(result, Err(ConfigError::Backup { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_update_refuses_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        fs::write(&path, "{ broken").unwrap();
        let mut store = ConfigStore::new();

        let result = store.update(&path, |doc| {
            doc.vars.insert("k".to_string(), "v".to_string());
        });

        assert!(matches!(result, Err(ConfigError::Malformed { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[test]
    fn test_update_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".nrun.json");
        let mut store = ConfigStore::new();

        store
            .update(&path, |doc| {
                doc.projects.insert("a".to_string(), "/a".to_string());
            })
            .unwrap();

        assert!(path.exists());
        assert!(!backup_path(&path).exists());
    }
}
