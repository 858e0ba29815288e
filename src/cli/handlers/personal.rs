// src/cli/handlers/personal.rs

use crate::{
    cli::{Cli, handlers::commons},
    context::RunContext,
    system::{executor::LaunchSpec, shell::discover_shell},
};
use anyhow::{Result, anyhow};
use colored::Colorize;

/// `--pf <name>`: runs every command of `personalflags[name]` through the shell, in
/// the project root.
///
/// A failing command is reported and the remaining ones still run. Returns the first
/// non-zero exit code.
pub fn handle(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let name = cli.personal_flag.clone().unwrap_or_default();
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let commands = commons::global_document(ctx)?
        .personalflags
        .get(&name)
        .filter(|commands| !commands.is_empty())
        .cloned()
        .ok_or_else(|| anyhow!("Personal flag '{}' is not defined", name))?;

    if cli.verbose {
        println!("Running the personal flag {}", name.cyan());
    }
    let shell = discover_shell()?;
    let env = commons::base_env(cli, ctx).finish();

    let mut codes = Vec::with_capacity(commands.len());
    for command in &commands {
        if cli.verbose {
            println!("{} {}", "→".blue(), command.green());
        }
        let spec = LaunchSpec::shell(&shell, command, &invocation.working_dir, env.clone());
        let code = match ctx.launcher.launch(&spec) {
            Ok(code) => code,
            Err(e) => {
                log::error!("{}", e);
                1
            }
        };
        if code != 0 {
            log::error!("Personal flag '{}': '{}' exited with code {}", name, command, code);
        }
        codes.push(code);
    }
    Ok(commons::first_failure(codes))
}
