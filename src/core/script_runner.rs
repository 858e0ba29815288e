// src/core/script_runner.rs

use crate::{
    constants::LOCAL_BIN_DIR,
    core::commons::append_args,
    models::Manifest,
    system::{
        executor::{EnvBuilder, EnvLayers, ExecutionError, LaunchSpec, ProcessLauncher, prepare_environment},
        notifier::Notifier,
    },
};
use colored::Colorize;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    static ref SELF_INVOCATION_RE: Regex =
        Regex::new(r"^[^\s]*nrun(\s|$)").expect("self-invocation pattern must compile");
}

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Script '{0}' does not exist.")]
    NotFound(String),
    #[error("Script '{0}' has pipe rules, but piping between processes is not supported.")]
    PipesUnsupported(String),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Switches that change how a manifest script is run.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    /// Skip the per-script environment assignments (`-D`).
    pub skip_default_env: bool,
    /// Do not warn about pipe rules (`--np`).
    pub silence_pipes: bool,
    /// Refuse to run scripts with pipe rules (`--fp`).
    pub force_pipes: bool,
    pub auth_token: Option<String>,
    pub verbose: bool,
}

/// Whether a script body calls this tool again.
///
/// Textual check on the first word only: `nrun`, `./bin/nrun`, etc. A wrapper script
/// that calls the tool indirectly is not detected.
pub fn is_self_invocation(body: &str) -> bool {
    SELF_INVOCATION_RE.is_match(body.trim_start())
}

/// Runs scripts from one project's manifest.
pub struct ScriptRunner<'a> {
    pub launcher: &'a dyn ProcessLauncher,
    pub notifier: &'a Notifier,
    pub shell: &'a str,
    pub manifest: &'a Manifest,
    pub root: &'a Path,
    pub env_defaults: &'a BTreeMap<String, String>,
    pub pipes: &'a BTreeMap<String, Vec<String>>,
    pub options: &'a ScriptOptions,
    /// Global package directory, put on `PATH` after the project's own bin dir.
    pub global_bin: Option<PathBuf>,
}

impl fmt::Debug for ScriptRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRunner")
            .field("shell", &self.shell)
            .field("root", &self.root)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScriptRunner<'_> {
    /// Runs `pre<script>`, `<script>` and `post<script>`, stopping at the first
    /// non-zero exit. Returns the exit code to report.
    ///
    /// Hooks do not receive the positional arguments.
    pub fn run(&self, script: &str, args: &[String]) -> Result<i32, ScriptError> {
        let body = self
            .manifest
            .scripts
            .get(script)
            .filter(|body| !body.trim().is_empty())
            .ok_or_else(|| ScriptError::NotFound(script.to_string()))?;

        self.check_pipes(script)?;

        if self.options.verbose {
            let described = if args.is_empty() {
                "no args".to_string()
            } else {
                format!("args {}", args.join(","))
            };
            println!("Running {} in {} with {}", script.cyan(), self.root.display(), described);
        }

        let code = self.run_hook(&format!("pre{}", script))?;
        if code != 0 {
            return Ok(code);
        }
        let code = self.run_body(script, body, args)?;
        if code != 0 {
            return Ok(code);
        }
        self.run_hook(&format!("post{}", script))
    }

    fn run_hook(&self, hook: &str) -> Result<i32, ScriptError> {
        match self.manifest.scripts.get(hook).filter(|b| !b.trim().is_empty()) {
            Some(body) => {
                log::debug!("Running hook '{}'", hook);
                self.run_body(hook, body, &[])
            }
            None => Ok(0),
        }
    }

    fn run_body(&self, script: &str, body: &str, args: &[String]) -> Result<i32, ScriptError> {
        if is_self_invocation(body) {
            log::warn!("Recursive call to nrun detected in script '{}', not running it.", script);
            return Ok(0);
        }

        let env = prepare_environment(EnvBuilder::inherited(), &self.env_layers(script));
        let command_line = append_args(body, args);
        let spec = LaunchSpec::shell(self.shell, &command_line, self.root, env);

        if self.options.verbose {
            println!("{} {}", "→".blue(), command_line.green());
        }
        let code = self.launcher.launch(&spec)?;
        if code != 0 {
            log::error!("Script '{}' exited with code {}", script, code);
            self.notifier
                .notify(format!("Process failed with error-code {}", code));
        }
        Ok(code)
    }

    fn env_layers(&self, script: &str) -> EnvLayers {
        let mut assignments = Vec::new();
        if !self.options.skip_default_env {
            let underscored = script.replace(':', "_");
            let mut keys = vec![script];
            if underscored != script {
                keys.push(underscored.as_str());
            }
            for key in keys {
                if let Some(raw) = self.env_defaults.get(key) {
                    match shlex::split(raw) {
                        Some(parts) => assignments.extend(parts),
                        None => log::warn!("Could not parse environment for '{}': {}", key, raw),
                    }
                }
            }
            if self.options.verbose && !assignments.is_empty() {
                println!("Adding environment: {}", assignments.join(" ").dimmed());
            }
        }

        let mut bin_dirs = Vec::new();
        let local_bin = self.root.join(LOCAL_BIN_DIR);
        if local_bin.is_dir() {
            bin_dirs.push(local_bin);
        }
        bin_dirs.extend(self.global_bin.clone());

        EnvLayers {
            assignments,
            bin_dirs,
            auth_token: self.options.auth_token.clone(),
        }
    }

    fn check_pipes(&self, script: &str) -> Result<(), ScriptError> {
        let Some(stages) = self.pipes.get(script) else {
            return Ok(());
        };
        if self.options.force_pipes {
            return Err(ScriptError::PipesUnsupported(script.to_string()));
        }
        if !self.options.silence_pipes {
            println!(
                "{} pipes are configured for '{}' ({}) but are not supported; running without them.",
                "Warning:".yellow().bold(),
                script,
                stages.join(" | ")
            );
        }
        Ok(())
    }
}
