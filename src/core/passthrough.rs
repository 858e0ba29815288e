// src/core/passthrough.rs

use crate::{
    constants::PACKAGE_MANAGER,
    system::executor::{EnvBuilder, ExecutionError, LaunchSpec, ProcessLauncher},
};
use colored::Colorize;
use std::io::Write;
use std::path::Path;

/// Package manager subcommands that are forwarded when no script of that name exists.
pub const PASSTHROUGH_COMMANDS: &[&str] = &[
    "access", "adduser", "audit", "bin", "bugs", "cache", "ci", "completion", "config",
    "dedupe", "deprecate", "diff", "dist-tag", "docs", "doctor", "edit", "exec", "explain",
    "explore", "find-dupes", "fund", "get", "help", "hook", "init", "install",
    "install-ci-test", "install-test", "link", "ll", "login", "logout", "ls", "org",
    "outdated", "owner", "pack", "ping", "pkg", "prefix", "profile", "prune", "publish",
    "rebuild", "repo", "restart", "root", "run-script", "search", "set", "set-script",
    "shrinkwrap", "star", "stars", "start", "stop", "team", "test", "token", "uninstall",
    "unpublish", "unstar", "update", "version", "view", "whoami",
];

/// Whether an unknown script name should be handed to the package manager.
/// An empty name forwards to the bare package manager.
pub fn is_passthrough_command(script: &str) -> bool {
    script.is_empty() || PASSTHROUGH_COMMANDS.contains(&script)
}

/// Forwards `script` if it is a recognised subcommand. `None` when it is not.
pub fn forward(
    launcher: &dyn ProcessLauncher,
    script: &str,
    args: &[String],
    cwd: &Path,
    version: &str,
) -> Result<Option<i32>, ExecutionError> {
    if !is_passthrough_command(script) {
        return Ok(None);
    }
    run_package_manager(launcher, script, args, cwd, version).map(Some)
}

/// Runs `npm <script> <args…>` with the inherited environment and streams.
pub fn run_package_manager(
    launcher: &dyn ProcessLauncher,
    script: &str,
    args: &[String],
    cwd: &Path,
    version: &str,
) -> Result<i32, ExecutionError> {
    let full_args: Vec<String> = std::iter::once(script)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .chain(args.iter().cloned())
        .collect();

    if script == "version" {
        print!("nrun: {{\n  nrun: '{}'\n}},\n{}: ", version, PACKAGE_MANAGER);
        if let Err(e) = std::io::stdout().flush() {
            log::debug!("Could not flush the version banner: {}", e);
        }
    } else {
        let rule = "=".repeat(40);
        println!("{}", rule.dimmed());
        println!(
            "Running {}",
            format!("{} {}", PACKAGE_MANAGER, full_args.join(" ")).trim_end().blue()
        );
        println!("{}", rule.dimmed());
    }

    let spec = LaunchSpec {
        program: PACKAGE_MANAGER.to_string(),
        args: full_args,
        cwd: cwd.to_path_buf(),
        env: EnvBuilder::inherited().finish(),
    };
    launcher.launch(&spec)
}
