// src/core/paths.rs

use crate::constants::CONFIG_FILENAME;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref HOME_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find the home directory.")]
    HomeDirNotFound,
    #[error("Failed to expand path '{path}': {reason}")]
    Expansion { path: String, reason: String },
    #[error("The path '{path}' does not exist: {source}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Returns the user's home directory.
///
/// Memoized: the lookup happens once per process.
pub fn get_home_dir() -> Result<PathBuf, PathError> {
    let mut cached = HOME_DIR.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }
    let home = dirs::home_dir().ok_or(PathError::HomeDirNotFound)?;
    *cached = Some(home.clone());
    Ok(home)
}

/// Returns the path of the global configuration file (`~/.nrun.json`).
pub fn get_global_config_path() -> Result<PathBuf, PathError> {
    get_home_dir().map(|home| home.join(CONFIG_FILENAME))
}

/// Returns the path of the local configuration file inside `dir`.
pub fn get_local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

/// Resolves `target` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, target: &str) -> PathBuf {
    let candidate = Path::new(target);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Expands `~` and environment variables in a user-supplied path, makes it absolute
/// relative to `cwd`, and canonicalizes it. The path must exist.
pub fn expand_user_path(template: &str, cwd: &Path) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        path: template.to_string(),
        reason: e.to_string(),
    })?;
    let absolute = resolve_against(cwd, &expanded);
    dunce::canonicalize(&absolute).map_err(|source| PathError::NotFound {
        path: absolute.display().to_string(),
        source,
    })
}

/// Renders a path the way it is stored in and compared against the configuration.
pub fn display_path(path: &Path) -> String {
    dunce::simplified(path).to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_against_keeps_absolute_paths() {
        let base = Path::new("/work/project");
        assert_eq!(resolve_against(base, "/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(
            resolve_against(base, "sub/dir"),
            PathBuf::from("/work/project/sub/dir")
        );
    }

    #[test]
    fn test_expand_user_path_relative_to_cwd() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("app")).unwrap();

        // --- Execute ---
        let resolved = expand_user_path("./app", dir.path()).unwrap();

        // --- Assert ---
        let expected = dunce::canonicalize(dir.path().join("app")).unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_expand_user_path_missing_target_fails() {
        let dir = tempdir().unwrap();
        let result = expand_user_path("does-not-exist", dir.path());
        assert!(matches!(result, Err(PathError::NotFound { .. })));
    }
}
