// src/context.rs

use crate::{
    constants::PROJECT_ENV_VAR,
    core::{
        config_resolver::{ConfigSources, resolve_defaults},
        config_store::ConfigStore,
        interpolator::apply_vars,
        manifest::{self, LocatedManifest, ManifestError},
        paths,
    },
    models::ResolvedDefaults,
    system::{
        executor::{ProcessLauncher, SystemLauncher},
        notifier::Notifier,
    },
};
use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Process-wide state for one run of the tool.
///
/// Owns the configuration cache, so a document is parsed at most once per run,
/// and the notification queue, which must be drained before the process exits.
pub struct RunContext {
    pub store: ConfigStore,
    pub notifier: Notifier,
    pub launcher: Box<dyn ProcessLauncher>,
    pub global_config_path: PathBuf,
    /// The directory the tool was started in.
    pub original_dir: PathBuf,
    /// `--var KEY=VALUE` pairs, layered over the document `vars`.
    pub cli_vars: BTreeMap<String, String>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("global_config_path", &self.global_config_path)
            .field("original_dir", &self.original_dir)
            .field("cli_vars", &self.cli_vars)
            .finish_non_exhaustive()
    }
}

/// Everything resolved for one invocation: where it runs, which manifest applies
/// and the effective configuration layers.
#[derive(Debug)]
pub struct Invocation {
    /// The raw name given on the command line (empty when none was given).
    pub requested: String,
    /// The name after `path` defaults were applied.
    pub script: String,
    pub args: Vec<String>,
    /// The directory chains and commands run in: the project root when a manifest
    /// was found, otherwise the (possibly overridden) working directory.
    pub working_dir: PathBuf,
    pub project: Result<LocatedManifest, ManifestError>,
    /// Effective layers, with `{{vars}}` applied.
    pub defaults: ResolvedDefaults,
}

impl RunContext {
    /// A context backed by the real process launcher and notifier.
    pub fn new(cli_vars: BTreeMap<String, String>) -> Result<Self> {
        let global_config_path =
            paths::get_global_config_path().context("Could not locate the global configuration")?;
        let original_dir = env::current_dir().context("Could not read the current directory")?;
        Ok(Self::with_parts(
            Box::new(SystemLauncher),
            Notifier::new(),
            global_config_path,
            original_dir,
            cli_vars,
        ))
    }

    pub fn with_parts(
        launcher: Box<dyn ProcessLauncher>,
        notifier: Notifier,
        global_config_path: PathBuf,
        original_dir: PathBuf,
        cli_vars: BTreeMap<String, String>,
    ) -> Self {
        Self {
            store: ConfigStore::new(),
            notifier,
            launcher,
            global_config_path,
            original_dir,
            cli_vars,
        }
    }

    /// Resolves the invocation for `words` (script name followed by its arguments).
    ///
    /// `path_override` is the `-p` value; when absent, `$NRUNPROJECT` is used.
    pub fn resolve(&mut self, words: &[String], path_override: Option<&str>) -> Result<Invocation> {
        let start_dir = self.start_dir(path_override)?;

        let project = manifest::locate(&start_dir);
        let current_path = match &project {
            Ok(located) => Some(located.root.clone()),
            Err(ManifestError::NotFound(_)) => None,
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };
        let working_dir = current_path.clone().unwrap_or_else(|| start_dir.clone());

        // The local layer lives next to where the run starts, not at the project root.
        let sources = ConfigSources {
            global: self.global_config_path.clone(),
            local: paths::get_local_config_path(&start_dir),
        };
        let resolved = resolve_defaults(&mut self.store, &sources, current_path.as_deref());

        let mut vars = resolved.vars.clone();
        vars.extend(self.cli_vars.clone());
        let mut defaults = apply_vars(&resolved, &vars);
        defaults.vars = vars;

        let (requested, args) = match words.split_first() {
            Some((name, rest)) => (name.clone(), rest.to_vec()),
            None => (String::new(), Vec::new()),
        };
        let script = defaults
            .path_defaults
            .get(&requested)
            .cloned()
            .unwrap_or_else(|| requested.clone());
        if script != requested {
            log::debug!("Using default '{}' for '{}'", script, requested);
        }

        Ok(Invocation {
            requested,
            script,
            args,
            working_dir,
            project,
            defaults,
        })
    }

    /// The directory to start the manifest search in.
    fn start_dir(&mut self, path_override: Option<&str>) -> Result<PathBuf> {
        let from_env = env::var(PROJECT_ENV_VAR).ok().filter(|v| !v.trim().is_empty());
        let Some(target) = path_override.map(str::to_string).or(from_env) else {
            return Ok(self.original_dir.clone());
        };

        if let Some(registered) = self.project_path(&target) {
            log::debug!("Using project '{}' at '{}'", target, registered);
            return check_dir(Path::new(&registered));
        }
        let expanded = paths::expand_user_path(&target, &self.original_dir)
            .with_context(|| format!("Invalid path override '{}'", target))?;
        check_dir(&expanded)
    }

    /// The path registered for `alias` in the global document.
    pub fn project_path(&mut self, alias: &str) -> Option<String> {
        let global = self.global_config_path.clone();
        self.store
            .read_layer(&global)
            .and_then(|doc| doc.projects.get(alias).cloned())
    }
}

fn check_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("'{}' is not a directory", path.display());
    }
    Ok(path.to_path_buf())
}

/// Parses `--var KEY=VALUE` arguments.
pub fn parse_cli_vars(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| anyhow!("Invalid variable '{}', expected KEY=VALUE", pair))
        })
        .collect()
}
