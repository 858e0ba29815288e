// src/cli/handlers/chains.rs

use crate::{
    cli::{Cli, handlers::commons},
    context::RunContext,
    core::chain_executor::{ChainError, ChainRunner},
    system::shell::discover_shell,
};
use anyhow::{Result, bail};
use colored::Colorize;

/// `--xl`: lists every chain with its commands.
pub fn handle_list(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    println!("Executable scripts:");
    for (name, commands) in &invocation.defaults.chains {
        println!("  {}", name.cyan());
        for command in commands {
            println!("    -> {}", command);
        }
    }
    Ok(0)
}

/// `--xs <chain>`: shows one chain.
pub fn handle_show(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let name = cli.show_chain.clone().unwrap_or_default();
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let commands = invocation
        .defaults
        .chains
        .get(&name)
        .ok_or_else(|| ChainError::NotFound(name.clone()))?;

    println!("Executable script {}:", name.cyan());
    for command in commands {
        println!("  -> {}", command);
    }
    Ok(0)
}

/// `--xa <chain> <words…>`: appends the words, joined by spaces, as one command.
pub fn handle_add(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let name = cli.add_chain.clone().unwrap_or_default();
    let command = cli.words.join(" ");
    if command.trim().is_empty() {
        bail!("Usage: nrun --xa <chain> <command...>");
    }

    let global = ctx.global_config_path.clone();
    ctx.store.update(&global, |doc| {
        doc.scripts.entry(name.clone()).or_default().push(command.clone());
    })?;
    println!("{} Command added to the executable script \"{}\"", "✔".green(), name.cyan());
    Ok(0)
}

/// `--xr <chain> [chain…]`: removes chains. Unknown names are reported and skipped.
pub fn handle_remove(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let names: Vec<String> = cli
        .remove_chain
        .iter()
        .chain(cli.words.iter())
        .cloned()
        .collect();

    let global = ctx.global_config_path.clone();
    let removed: Vec<(String, bool)> = ctx.store.update(&global, |doc| {
        names
            .iter()
            .map(|name| (name.clone(), doc.scripts.remove(name).is_some()))
            .collect()
    })?;

    for (name, existed) in &removed {
        if *existed {
            println!("{} Executable script \"{}\" has been removed", "✔".green(), name.cyan());
        } else {
            log::warn!("The script \"{}\" doesn't exist", name);
        }
    }
    Ok(0)
}

/// `-x <chain> [args…]`: runs one chain in the project root.
pub fn handle_run(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&cli.words, cli.path_override.as_deref())?;
    let name = invocation.requested.as_str();
    if name.is_empty() {
        bail!("Usage: nrun -x <chain> [args...]");
    }
    let commands = invocation
        .defaults
        .chains
        .get(name)
        .ok_or_else(|| ChainError::NotFound(name.to_string()))?;

    let shell = discover_shell()?;
    let env = commons::base_env(cli, ctx);
    let runner = ChainRunner::new(ctx.launcher.as_ref(), &shell, &env, &invocation.args).verbose(cli.verbose);
    let result = runner.run(name, commands, &invocation.working_dir);
    Ok(commons::report_chain_result(name, &result, ctx))
}

/// `--xp <chain> [args…]`: runs one chain in every registered project.
pub fn handle_run_in_projects(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&cli.words, cli.path_override.as_deref())?;
    let name = invocation.requested.as_str();
    let commands = invocation
        .defaults
        .chains
        .get(name)
        .ok_or_else(|| ChainError::NotFound(name.to_string()))?;

    let shell = discover_shell()?;
    let env = commons::base_env(cli, ctx);
    let runner = ChainRunner::new(ctx.launcher.as_ref(), &shell, &env, &invocation.args).verbose(cli.verbose);
    let results = runner.run_in_projects(name, commands, &invocation.defaults.projects);

    let codes: Vec<i32> = results
        .iter()
        .map(|(alias, result)| commons::report_chain_result(&format!("{}@{}", name, alias), result, ctx))
        .collect();
    Ok(commons::first_failure(codes))
}

/// `--xm <chain…>`: runs several chains concurrently and waits for all of them.
pub fn handle_run_many(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let mut chains = Vec::with_capacity(cli.words.len());
    for name in &cli.words {
        match invocation.defaults.chains.get(name) {
            Some(commands) => {
                if cli.verbose {
                    println!("Executing script {}", name.cyan());
                }
                chains.push((name.clone(), commands.clone()));
            }
            None => log::warn!("No script found for command '{}'", name),
        }
    }
    if chains.is_empty() {
        bail!("None of the requested chains exist.");
    }

    let shell = discover_shell()?;
    let env = commons::base_env(cli, ctx);
    let runner = ChainRunner::new(ctx.launcher.as_ref(), &shell, &env, &[]).verbose(cli.verbose);
    let results = runner.run_concurrently(&chains, &invocation.working_dir)?;

    let codes: Vec<i32> = chains
        .iter()
        .zip(results.iter())
        .map(|((name, _), result)| commons::report_chain_result(name, result, ctx))
        .collect();
    Ok(commons::first_failure(codes))
}
