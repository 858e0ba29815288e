// src/system/executor.rs

use crate::constants::{AUTH_TOKEN_VAR, OVERRIDE_PREFIX, PACKAGE_MANAGER};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, #[source] std::io::Error),
    #[error("Command '{0}' exited with a non-zero error code.")]
    NonZeroExitStatus(String),
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

// --- Launch description ---

/// Everything needed to start one child process.
///
/// `env` is the complete child environment: the launcher clears the inherited one
/// and applies exactly these pairs, in order. Inherited entries that are not UTF-8
/// are the exception and are passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// A `shell -c <command_line>` invocation.
    pub fn shell(shell: &str, command_line: &str, cwd: &Path, env: Vec<(String, String)>) -> Self {
        Self {
            program: shell.to_string(),
            args: vec!["-c".to_string(), command_line.to_string()],
            cwd: cwd.to_path_buf(),
            env,
        }
    }

    /// Human readable command line, used in logs and error messages.
    pub fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Starts child processes. Blocking: `launch` returns only once the child has exited.
///
/// `Sync` so that fan-out workers can share one launcher.
pub trait ProcessLauncher: Sync {
    /// Runs the process with inherited standard streams and returns its exit code.
    fn launch(&self, spec: &LaunchSpec) -> Result<i32, ExecutionError>;
}

/// The real launcher, backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<i32, ExecutionError> {
        if spec.program.trim().is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }
        log::debug!("Launching '{}' in '{}'", spec.describe(), spec.cwd.display());

        let status = StdCommand::new(&spec.program)
            .args(&spec.args)
            .current_dir(dunce::simplified(&spec.cwd))
            .env_clear()
            .envs(non_utf8_entries(env::vars_os(), &spec.env))
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| ExecutionError::CommandFailed(spec.describe(), e))?;

        // A child killed by a signal has no code.
        Ok(status.code().unwrap_or(1))
    }
}

/// Inherited entries that are not valid UTF-8. `EnvBuilder` cannot carry them, so
/// the launcher passes them through unless `env` sets the same key.
fn non_utf8_entries(
    inherited: impl IntoIterator<Item = (OsString, OsString)>,
    env: &[(String, String)],
) -> Vec<(OsString, OsString)> {
    inherited
        .into_iter()
        .filter(|(k, v)| k.to_str().is_none() || v.to_str().is_none())
        .filter(|(k, _)| !env.iter().any(|(key, _)| OsStr::new(key) == k.as_os_str()))
        .collect()
}

/// Executes a command and captures its standard output.
/// Stderr is discarded; the command inherits the current process environment.
pub fn execute_and_capture_output(command_line: &str, cwd: &Path) -> Result<String, ExecutionError> {
    let trimmed_command = command_line.trim();
    let parts = shlex::split(trimmed_command)
        .ok_or_else(|| ExecutionError::CommandParse(trimmed_command.to_string()))?;
    let Some((program, args)) = parts.split_first() else {
        return Err(ExecutionError::EmptyCommand);
    };

    let command_output = StdCommand::new(program)
        .args(args)
        .current_dir(dunce::simplified(cwd))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| ExecutionError::CommandFailed(trimmed_command.to_string(), e))?;

    if !command_output.status.success() {
        return Err(ExecutionError::NonZeroExitStatus(trimmed_command.to_string()));
    }

    String::from_utf8(command_output.stdout).map_err(|e| ExecutionError::InvalidUtf8Output {
        command: trimmed_command.to_string(),
        source: e,
    })
}

// --- Environment construction ---

/// An ordered list of environment assignments. Later entries win over earlier ones
/// for the same key, and `finish` resolves `OVERRIDE_` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvBuilder {
    entries: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts from the current process environment. Non UTF-8 entries are skipped.
    pub fn inherited() -> Self {
        let entries = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Appends a `KEY=VALUE` assignment. Returns `false` (and appends nothing) when
    /// the text has no `=` or an empty key.
    pub fn push_assignment(&mut self, assignment: &str) -> bool {
        match assignment.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                self.push(key.trim(), value);
                true
            }
            _ => {
                log::warn!("Ignoring environment assignment without a key: '{}'", assignment);
                false
            }
        }
    }

    /// Removes every assignment for `key`.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.entries.retain(|(k, _)| k != key);
        self
    }

    /// The effective (last) value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Prepends `dir` to the effective `PATH`. Successive calls accumulate.
    pub fn prepend_path(&mut self, dir: &Path) -> &mut Self {
        let current = self.get("PATH").unwrap_or_default().to_string();
        let rest = env::split_paths(&current).filter(|p| !p.as_os_str().is_empty());
        let dirs = std::iter::once(dir.to_path_buf()).chain(rest);
        match env::join_paths(dirs).map(|joined| joined.into_string()) {
            Ok(Ok(joined)) => {
                self.push("PATH", joined);
            }
            _ => log::warn!("Could not add '{}' to PATH.", dir.display()),
        }
        self
    }

    /// Applies the override pass and returns the final list.
    ///
    /// Every `OVERRIDE_KEY=value` entry is renamed to `KEY=value` and removes all
    /// other `KEY` assignments. Among overrides, list order decides.
    pub fn finish(self) -> Vec<(String, String)> {
        let (overrides, mut plain): (Vec<_>, Vec<_>) = self
            .entries
            .into_iter()
            .partition(|(k, _)| k.len() > OVERRIDE_PREFIX.len() && k.starts_with(OVERRIDE_PREFIX));

        for (key, value) in overrides {
            let key = key
                .strip_prefix(OVERRIDE_PREFIX)
                .unwrap_or(key.as_str())
                .to_string();
            log::debug!("Overridden {}={}", key, value);
            plain.retain(|(k, _)| *k != key);
            plain.push((key, value));
        }
        plain
    }
}

/// The layered sources of a script's child environment, applied over a base.
#[derive(Debug, Clone, Default)]
pub struct EnvLayers {
    /// `KEY=VALUE` assignments for the script.
    pub assignments: Vec<String>,
    /// Directories to put on `PATH`, highest priority first.
    pub bin_dirs: Vec<PathBuf>,
    pub auth_token: Option<String>,
}

/// Builds the final child environment: base, then script assignments, then the `PATH`
/// prefixes, then the auth token, then the override pass.
pub fn prepare_environment(mut base: EnvBuilder, layers: &EnvLayers) -> Vec<(String, String)> {
    for assignment in &layers.assignments {
        base.push_assignment(assignment);
    }
    for dir in layers.bin_dirs.iter().rev() {
        base.prepend_path(dir);
    }
    if let Some(token) = &layers.auth_token {
        base.push(AUTH_TOKEN_VAR, token.as_str());
    }
    base.finish()
}

/// The directory the package manager installs global packages into (`npm root -g`),
/// if it can be determined and exists.
pub fn global_package_root(cwd: &Path) -> Option<PathBuf> {
    let command_line = format!("{} root -g", PACKAGE_MANAGER);
    match execute_and_capture_output(&command_line, cwd) {
        Ok(output) => {
            let root = PathBuf::from(output.trim());
            (!output.trim().is_empty() && root.is_dir()).then_some(root)
        }
        Err(e) => {
            log::debug!("Global package root not available: {}", e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A launcher that records every spec instead of spawning, and answers with
    /// preconfigured exit codes keyed by the last argument (the shell command line).
    #[derive(Default)]
    pub(crate) struct RecordingLauncher {
        pub(crate) launched: Mutex<Vec<LaunchSpec>>,
        pub(crate) exit_codes: HashMap<String, i32>,
    }

    impl RecordingLauncher {
        pub(crate) fn failing_on(command: &str, code: i32) -> Self {
            let mut launcher = Self::default();
            launcher.exit_codes.insert(command.to_string(), code);
            launcher
        }

        pub(crate) fn commands(&self) -> Vec<String> {
            self.specs()
                .iter()
                .map(|spec| spec.args.last().cloned().unwrap_or_default())
                .collect()
        }

        pub(crate) fn specs(&self) -> Vec<LaunchSpec> {
            self.launched.lock().unwrap().clone()
        }
    }

    impl<T: ProcessLauncher + Send> ProcessLauncher for std::sync::Arc<T> {
        fn launch(&self, spec: &LaunchSpec) -> Result<i32, ExecutionError> {
            (**self).launch(spec)
        }
    }

    impl ProcessLauncher for RecordingLauncher {
        fn launch(&self, spec: &LaunchSpec) -> Result<i32, ExecutionError> {
            self.launched.lock().unwrap().push(spec.clone());
            let key = spec.args.last().cloned().unwrap_or_default();
            Ok(self.exit_codes.get(&key).copied().unwrap_or(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        env.iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_override_replaces_earlier_assignment() {
        // --- Setup ---
        let mut builder = EnvBuilder::empty();
        builder.push("PATH", "/usr/bin").push("HOME", "/home/me");
        builder.push_assignment("OVERRIDE_PATH=/custom/bin");

        // --- Execute ---
        let env = builder.finish();

        // --- Assert ---
        assert_eq!(lookup(&env, "PATH"), vec!["/custom/bin"]);
        assert!(lookup(&env, "OVERRIDE_PATH").is_empty());
        assert_eq!(lookup(&env, "HOME"), vec!["/home/me"]);
    }

    #[test]
    fn test_later_override_wins_among_overrides() {
        let mut builder = EnvBuilder::empty();
        builder
            .push("OVERRIDE_MODE", "first")
            .push("MODE", "plain")
            .push("OVERRIDE_MODE", "second");
        assert_eq!(lookup(&builder.finish(), "MODE"), vec!["second"]);
    }

    #[test]
    fn test_bare_override_prefix_is_kept_as_is() {
        let mut builder = EnvBuilder::empty();
        builder.push("OVERRIDE_", "x");
        assert_eq!(lookup(&builder.finish(), "OVERRIDE_"), vec!["x"]);
    }

    #[test]
    fn test_push_assignment_rejects_missing_key() {
        let mut builder = EnvBuilder::empty();
        assert!(!builder.push_assignment("no-equals-sign"));
        assert!(!builder.push_assignment("=value"));
        assert!(builder.push_assignment("EMPTY="));
        assert_eq!(builder.get("EMPTY"), Some(""));
    }

    #[test]
    fn test_path_prefixes_accumulate() {
        let mut builder = EnvBuilder::empty();
        builder.push("PATH", "/usr/bin");
        let layers = EnvLayers {
            bin_dirs: vec![PathBuf::from("/proj/node_modules/.bin"), PathBuf::from("/global")],
            ..Default::default()
        };

        let env = prepare_environment(builder, &layers);

        let path = lookup(&env, "PATH").last().copied().unwrap().to_string();
        let parts: Vec<PathBuf> = env::split_paths(&path).collect();
        assert_eq!(
            parts,
            vec![
                PathBuf::from("/proj/node_modules/.bin"),
                PathBuf::from("/global"),
                PathBuf::from("/usr/bin"),
            ]
        );
    }

    #[test]
    fn test_prepare_environment_layers_in_order() {
        let mut base = EnvBuilder::empty();
        base.push("NODE_ENV", "production");
        let layers = EnvLayers {
            assignments: vec!["NODE_ENV=development".to_string(), "OVERRIDE_TOKEN=abc".to_string()],
            bin_dirs: Vec::new(),
            auth_token: Some("secret".to_string()),
        };

        let env = prepare_environment(base, &layers);

        assert_eq!(EnvBuilder { entries: env.clone() }.get("NODE_ENV"), Some("development"));
        assert_eq!(lookup(&env, AUTH_TOKEN_VAR), vec!["secret"]);
        assert_eq!(lookup(&env, "TOKEN"), vec!["abc"]);
    }

    #[test]
    fn test_launch_spec_shell_form() {
        let spec = LaunchSpec::shell("/bin/sh", "echo hi", Path::new("/tmp"), Vec::new());
        assert_eq!(spec.args, vec!["-c", "echo hi"]);
        assert_eq!(spec.describe(), "/bin/sh -c echo hi");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_launcher_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec::shell("/bin/sh", "exit 3", dir.path(), EnvBuilder::inherited().finish());
        assert_eq!(SystemLauncher.launch(&spec).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_inherited_entries_are_passed_through() {
        use std::os::unix::ffi::OsStringExt;

        // --- Setup ---
        let raw = OsString::from_vec(vec![0x66, 0x6f, 0xff]);
        let inherited = vec![
            (OsString::from("RAW_VALUE"), raw.clone()),
            (OsString::from("PATH"), OsString::from("/usr/bin")),
            (OsString::from("SHADOWED"), OsString::from_vec(vec![0xfe])),
        ];
        let env = vec![("SHADOWED".to_string(), "plain".to_string())];

        // --- Execute ---
        let kept = non_utf8_entries(inherited, &env);

        // --- Assert ---
        assert_eq!(kept, vec![(OsString::from("RAW_VALUE"), raw)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_launcher_uses_exact_environment() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("seen");
        let mut builder = EnvBuilder::empty();
        builder.push("NRUN_MARKER", "visible");
        let command = format!("[ \"$NRUN_MARKER\" = visible ] && [ -z \"$HOME\" ] && : > {}", marker.display());
        let spec = LaunchSpec::shell("/bin/sh", &command, dir.path(), builder.finish());

        assert_eq!(SystemLauncher.launch(&spec).unwrap(), 0);
        assert!(marker.exists());
    }
}
