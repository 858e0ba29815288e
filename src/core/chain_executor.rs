//! # Script Chain Executor
//!
//! Runs a named chain: an ordered list of shell command lines and `@@` directives.
//! Literal elements are dispatched through the shell one at a time; directives are
//! interpreted in-process and never spawn anything. A failing literal aborts the
//! rest of the chain with an error, a failing guard halts it quietly.

use crate::{
    constants::CHAIN_ENV_PREFIX,
    core::{directive::parse_chain, paths::resolve_against},
    models::{ChainElement, Directive},
    system::executor::{EnvBuilder, ExecutionError, LaunchSpec, ProcessLauncher},
};
use colored::Colorize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("No chain called '{0}' is configured.")]
    NotFound(String),
    #[error("Step {step} of chain '{chain}' ('{command}') exited with code {code}.")]
    StepFailed {
        chain: String,
        step: usize,
        command: String,
        code: i32,
    },
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("Could not start the chain workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ChainError {
    /// The exit code a failing step produced, if that is why the chain failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::StepFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Why a chain stopped before its last element without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    GuardFailed { negated: bool, directive: Directive },
    UnknownDirective(String),
    InvalidDirectory(PathBuf),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GuardFailed { negated, directive } => {
                write!(f, "guard {}{:?} did not hold", if *negated { "!" } else { "" }, directive)
            }
            Self::UnknownDirective(name) => write!(f, "unknown directive '{}'", name),
            Self::InvalidDirectory(path) => write!(f, "'{}' is not a directory", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Completed,
    Halted { step: usize, reason: HaltReason },
}

/// Mutable state of one chain run. Each run (and each fan-out worker) has its own.
#[derive(Debug, Clone)]
struct ChainState {
    cwd: PathBuf,
    env: EnvBuilder,
}

/// Runs chains with a fixed launcher, shell, base environment and argument list.
#[derive(Clone, Copy)]
pub struct ChainRunner<'a> {
    launcher: &'a dyn ProcessLauncher,
    shell: &'a str,
    base_env: &'a EnvBuilder,
    args: &'a [String],
    verbose: bool,
}

impl fmt::Debug for ChainRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRunner")
            .field("shell", &self.shell)
            .field("args", &self.args)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl<'a> ChainRunner<'a> {
    pub fn new(
        launcher: &'a dyn ProcessLauncher,
        shell: &'a str,
        base_env: &'a EnvBuilder,
        args: &'a [String],
    ) -> Self {
        Self {
            launcher,
            shell,
            base_env,
            args,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Runs `elements` in order, starting in `start_dir`.
    pub fn run(&self, name: &str, elements: &[String], start_dir: &Path) -> Result<ChainOutcome, ChainError> {
        if self.verbose {
            println!("Executing chain \"{}\" in {}", name.cyan(), start_dir.display());
        }
        let mut state = ChainState {
            cwd: start_dir.to_path_buf(),
            env: self.base_env.clone(),
        };

        for (step, element) in parse_chain(elements).into_iter().enumerate() {
            match element {
                ChainElement::Literal(command) => self.run_literal(name, step, &command, &state)?,
                ChainElement::Directive { negated, directive } => {
                    if let Some(reason) = apply_directive(&directive, negated, &mut state) {
                        match &reason {
                            HaltReason::GuardFailed { .. } => {
                                log::debug!("Chain '{}' stopped at step {}: {}", name, step, reason);
                            }
                            _ => log::error!("Chain '{}' stopped at step {}: {}", name, step, reason),
                        }
                        return Ok(ChainOutcome::Halted { step, reason });
                    }
                }
            }
        }
        Ok(ChainOutcome::Completed)
    }

    /// Runs several chains at once, one worker per chain, and waits for all of them.
    ///
    /// Results are returned in the order the chains were given.
    pub fn run_concurrently(
        &self,
        chains: &[(String, Vec<String>)],
        start_dir: &Path,
    ) -> Result<Vec<Result<ChainOutcome, ChainError>>, ChainError> {
        if chains.is_empty() {
            return Ok(Vec::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(chains.len())
            .thread_name(|i| format!("nrun-chain-{}", i))
            .build()?;

        let mut results: Vec<Option<Result<ChainOutcome, ChainError>>> =
            chains.iter().map(|_| None).collect();
        pool.scope(|scope| {
            for ((name, elements), slot) in chains.iter().zip(results.iter_mut()) {
                scope.spawn(move |_| {
                    *slot = Some(self.run(name, elements, start_dir));
                });
            }
        });
        Ok(results.into_iter().flatten().collect())
    }

    /// Runs one chain in every registered project, in alias order. A failure in one
    /// project does not stop the others.
    ///
    /// Each project starts from the base environment: `@@set`/`@@unset` changes made
    /// while running in one project do not carry over to the next.
    pub fn run_in_projects(
        &self,
        name: &str,
        elements: &[String],
        projects: &BTreeMap<String, String>,
    ) -> Vec<(String, Result<ChainOutcome, ChainError>)> {
        let mut results = Vec::with_capacity(projects.len());
        for (alias, path) in projects {
            let dir = Path::new(path);
            if !dir.is_dir() {
                log::warn!("Skipping project '{}': '{}' is not a directory.", alias, path);
                continue;
            }
            println!("{} {} {}", "→".blue(), alias.cyan(), path.dimmed());
            results.push((alias.clone(), self.run(name, elements, dir)));
            println!();
        }
        results
    }

    fn run_literal(&self, name: &str, step: usize, command: &str, state: &ChainState) -> Result<(), ChainError> {
        if command.trim().is_empty() {
            return Ok(());
        }
        if self.verbose {
            println!("{} {}", "→".blue(), command.green());
        }

        let mut env = state.env.clone();
        env.push(format!("{}CURRENT_PATH", CHAIN_ENV_PREFIX), state.cwd.display().to_string())
            .push(format!("{}CURRENT_SCRIPT", CHAIN_ENV_PREFIX), name)
            .push(format!("{}CURRENT_SCRIPT_CODE", CHAIN_ENV_PREFIX), command);
        for (index, arg) in self.args.iter().enumerate() {
            env.push(format!("{}ARG_{}", CHAIN_ENV_PREFIX, index), arg.as_str());
        }

        let spec = LaunchSpec::shell(self.shell, command, &state.cwd, env.finish());
        let code = self.launcher.launch(&spec)?;
        if code != 0 {
            return Err(ChainError::StepFailed {
                chain: name.to_string(),
                step,
                command: command.to_string(),
                code,
            });
        }
        Ok(())
    }
}

// --- Directive interpretation ---

/// Applies one directive to the chain state. Returns the reason to halt, if any.
fn apply_directive(directive: &Directive, negated: bool, state: &mut ChainState) -> Option<HaltReason> {
    if directive.is_guard() {
        let holds = evaluate_guard(directive, &state.cwd, |p| p.exists())?;
        return (holds == negated).then(|| HaltReason::GuardFailed {
            negated,
            directive: directive.clone(),
        });
    }

    match directive {
        Directive::Cd(target) if !target.is_empty() => {
            let next = resolve_against(&state.cwd, target);
            if !next.is_dir() {
                return Some(HaltReason::InvalidDirectory(next));
            }
            state.cwd = dunce::canonicalize(&next).unwrap_or(next);
        }
        Directive::Set(assignment) => {
            state.env.push_assignment(assignment);
        }
        Directive::Unset(key) if !key.is_empty() => {
            state.env.remove(key);
        }
        Directive::Echo(text) => println!("{}", text),
        Directive::Unknown(name) => return Some(HaltReason::UnknownDirective(name.clone())),
        _ => {}
    }
    None
}

/// Evaluates a guard before negation. `None` means the guard does not apply
/// (an `isfile`/`isdir` without a path).
///
/// `exists` is only consulted by `hasfile`/`hasfiles`, which stop probing as soon
/// as the outcome is known. An empty path list counts as missing.
fn evaluate_guard(directive: &Directive, cwd: &Path, mut exists: impl FnMut(&Path) -> bool) -> Option<bool> {
    let mut present = |p: &String| exists(&resolve_against(cwd, p));
    match directive {
        Directive::HasFile(paths) => Some(!paths.is_empty() && paths.iter().any(&mut present)),
        Directive::HasFiles(paths) => Some(!paths.is_empty() && paths.iter().all(&mut present)),
        Directive::IsFile(path) if !path.is_empty() => Some(resolve_against(cwd, path).is_file()),
        Directive::IsDir(path) if !path.is_empty() => Some(resolve_against(cwd, path).is_dir()),
        _ => None,
    }
}
