// src/cli/handlers/exec.rs

use crate::{
    cli::{Cli, handlers::commons},
    constants::LOCAL_BIN_DIR,
    context::RunContext,
    system::executor::{EnvBuilder, EnvLayers, LaunchSpec, ProcessLauncher, prepare_environment},
};
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::Path;

/// `-e <program> [args…]`: runs a program directly in the project root.
pub fn handle(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let words = command_words(cli)?;
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let token = commons::auth_token(cli, ctx);
    let code = launch_in(ctx.launcher.as_ref(), words, &invocation.working_dir, token, cli.verbose)?;
    if code != 0 {
        ctx.notifier.notify(format!("Process failed with error-code {}", code));
    }
    Ok(code)
}

/// `--ep <program> [args…]`: runs a program in every registered project, in alias order.
pub fn handle_in_projects(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let words = command_words(cli)?;
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let token = commons::auth_token(cli, ctx);

    let mut codes = Vec::with_capacity(invocation.defaults.projects.len());
    for (alias, path) in &invocation.defaults.projects {
        let dir = Path::new(path);
        if !dir.is_dir() {
            log::warn!("Skipping project '{}': '{}' is not a directory.", alias, path);
            continue;
        }
        println!("{} {} {}", "→".blue(), alias.cyan(), path.dimmed());
        let code = match launch_in(ctx.launcher.as_ref(), words, dir, token.clone(), cli.verbose) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                1
            }
        };
        println!();
        codes.push(code);
    }
    Ok(commons::first_failure(codes))
}

fn command_words(cli: &Cli) -> Result<&[String]> {
    let words = commons::strip_separator(&cli.words);
    if words.is_empty() {
        bail!("Usage: nrun -e <program> [args...]");
    }
    Ok(words)
}

fn launch_in(
    launcher: &dyn ProcessLauncher,
    words: &[String],
    dir: &Path,
    auth_token: Option<String>,
    verbose: bool,
) -> Result<i32> {
    let Some((program, args)) = words.split_first() else {
        bail!("No command specified to run.");
    };
    let local_bin = dir.join(LOCAL_BIN_DIR);
    let layers = EnvLayers {
        assignments: Vec::new(),
        bin_dirs: local_bin.is_dir().then_some(local_bin).into_iter().collect(),
        auth_token,
    };
    let spec = LaunchSpec {
        program: program.clone(),
        args: args.to_vec(),
        cwd: dir.to_path_buf(),
        env: prepare_environment(EnvBuilder::inherited(), &layers),
    };
    if verbose {
        println!("{} {}", "→".blue(), spec.describe().green());
    }
    Ok(launcher.launch(&spec)?)
}
