// src/core/manifest.rs

use crate::{
    constants::{MANIFEST_FILENAME, MAX_MANIFEST_DEPTH},
    models::Manifest,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("No {MANIFEST_FILENAME} found in '{0}' or any parent directory.")]
    NotFound(String),
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A manifest together with the directory that holds it (the project root).
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedManifest {
    pub manifest: Manifest,
    pub root: PathBuf,
}

/// Finds the closest manifest, starting in `start` and walking up at most
/// `MAX_MANIFEST_DEPTH` parent directories.
pub fn locate(start: &Path) -> Result<LocatedManifest, ManifestError> {
    let root = start
        .ancestors()
        .take(MAX_MANIFEST_DEPTH + 1)
        .find(|dir| dir.join(MANIFEST_FILENAME).is_file())
        .ok_or_else(|| ManifestError::NotFound(start.display().to_string()))?;

    log::debug!("Found {} in '{}'", MANIFEST_FILENAME, root.display());
    let manifest = load(&root.join(MANIFEST_FILENAME))?;
    Ok(LocatedManifest {
        manifest,
        root: root.to_path_buf(),
    })
}

/// Reads and parses a manifest file.
pub fn load(path: &Path) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Malformed {
        path: path.display().to_string(),
        source,
    })
}

/// Merges resolved script overrides into the manifest. Overrides win.
pub fn apply_overrides(manifest: &mut Manifest, overrides: &BTreeMap<String, String>) {
    for (name, body) in overrides {
        if let Some(previous) = manifest.scripts.insert(name.clone(), body.clone()) {
            log::debug!("Script '{}' overridden ('{}' -> '{}')", name, previous, body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_locate_walks_up_to_the_project_root() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILENAME),
            r#"{"name": "demo", "scripts": {"start": "node ."}, "private": true}"#,
        )
        .unwrap();
        let nested = dir.path().join("src").join("lib");
        fs::create_dir_all(&nested).unwrap();

        // --- Execute ---
        let located = locate(&nested).unwrap();

        // --- Assert ---
        assert_eq!(located.root, dir.path());
        assert_eq!(located.manifest.name.as_deref(), Some("demo"));
        assert_eq!(located.manifest.scripts["start"], "node .");
        assert_eq!(located.manifest.rest["private"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_manifest_without_scripts_is_valid() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILENAME), r#"{"name": "bare"}"#).unwrap();
        assert!(locate(dir.path()).unwrap().manifest.scripts.is_empty());
    }

    #[test]
    fn test_malformed_manifest_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILENAME), "{ nope").unwrap();
        assert!(matches!(locate(dir.path()), Err(ManifestError::Malformed { .. })));
    }

    #[test]
    fn test_apply_overrides_replaces_and_adds() {
        let mut manifest = Manifest::default();
        manifest.scripts.insert("start".into(), "node .".into());
        let overrides = BTreeMap::from([
            ("start".to_string(), "nodemon .".to_string()),
            ("lint".to_string(), "eslint .".to_string()),
        ]);

        apply_overrides(&mut manifest, &overrides);

        assert_eq!(manifest.scripts["start"], "nodemon .");
        assert_eq!(manifest.scripts["lint"], "eslint .");
    }
}
