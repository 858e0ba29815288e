// src/system/shell.rs

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Can't find any shell. Set $SHELL or install zsh, bash or sh.")]
    NotFound,
}

/// Shells tried, in order, when `$SHELL` is unusable.
const FALLBACK_SHELLS: [&str; 3] = ["zsh", "bash", "sh"];

/// Determines the shell used for `shell -c` dispatch.
///
/// `$SHELL` wins when it points at an existing file; otherwise the first of zsh,
/// bash and sh found on `PATH`.
pub fn discover_shell() -> Result<String, ShellError> {
    let shell_var = env::var("SHELL").ok();
    let path_var = env::var_os("PATH");
    let shell = find_shell(shell_var.as_deref(), path_var.as_deref()).ok_or(ShellError::NotFound)?;
    log::debug!("Using shell '{}'", shell.display());
    Ok(shell.to_string_lossy().to_string())
}

/// Looks `executable_name` up on the current `PATH`.
pub fn find_executable(executable_name: &str) -> Option<PathBuf> {
    find_executable_in_path(executable_name, &env::var_os("PATH")?)
}

fn find_shell(shell_var: Option<&str>, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if let Some(shell) = shell_var.filter(|s| !s.is_empty()) {
        if Path::new(shell).is_file() {
            return Some(PathBuf::from(shell));
        }
        log::debug!("$SHELL '{}' does not exist, searching PATH.", shell);
    }
    FALLBACK_SHELLS
        .iter()
        .find_map(|name| find_executable_in_path(name, path_var?))
}

fn find_executable_in_path(executable_name: &str, path_var: &OsStr) -> Option<PathBuf> {
    env::split_paths(path_var)
        .map(|dir| dir.join(executable_name))
        .find(|candidate| candidate.is_file())
}
