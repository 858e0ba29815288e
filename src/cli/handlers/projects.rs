// src/cli/handlers/projects.rs

use crate::{
    cli::{Cli, handlers::commons},
    context::RunContext,
    core::paths,
};
use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;

/// What registering an alias changed.
#[derive(Debug, PartialEq, Eq)]
enum AddOutcome {
    Added,
    Unchanged,
    Replaced(String),
}

/// `--pl`: lists registered projects, aliases padded to a common width.
pub fn handle_list(_cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let projects = commons::global_document(ctx)?.projects;
    if projects.is_empty() {
        println!("No projects are registered.");
        return Ok(0);
    }
    let width = projects.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    println!("The following projects are registered:");
    for (alias, path) in &projects {
        println!("{:<width$} : {}", alias, path, width = width);
    }
    Ok(0)
}

/// `--pa <alias> <path>`: registers or re-points a project.
pub fn handle_add(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let [alias, raw_path] = cli.words.as_slice() else {
        bail!("Usage: nrun --pa <alias> <path>");
    };

    let path = paths::expand_user_path(raw_path, &ctx.original_dir)
        .with_context(|| format!("Cannot register project '{}'", alias))?;
    if !path.is_dir() {
        bail!("'{}' is not a directory", path.display());
    }
    let path = paths::display_path(&path);

    let global = ctx.global_config_path.clone();
    let outcome = ctx.store.update(&global, |doc| {
        match doc.projects.insert(alias.clone(), path.clone()) {
            None => AddOutcome::Added,
            Some(previous) if previous == path => AddOutcome::Unchanged,
            Some(previous) => AddOutcome::Replaced(previous),
        }
    })?;

    match outcome {
        AddOutcome::Unchanged => {
            println!("Project \"{}\" already exists with this path", alias.cyan());
            return Ok(0);
        }
        AddOutcome::Replaced(previous) => println!(
            "Project \"{}\" located at \"{}\" will be replaced with \"{}\"",
            alias.cyan(),
            previous,
            path
        ),
        AddOutcome::Added => {}
    }
    println!("{} Project \"{}\" added", "✔".green(), alias.cyan());
    Ok(0)
}

/// `--pr <alias…>`: unregisters projects. Unknown aliases are reported and skipped.
pub fn handle_remove(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    if cli.words.is_empty() {
        bail!("Usage: nrun --pr <alias> [alias...]");
    }
    let global = ctx.global_config_path.clone();
    let removed: Vec<(String, bool)> = ctx.store.update(&global, |doc| {
        cli.words
            .iter()
            .map(|alias| (alias.clone(), doc.projects.remove(alias).is_some()))
            .collect()
    })?;

    for (alias, was_registered) in &removed {
        if *was_registered {
            println!("{} Project \"{}\" removed", "✔".green(), alias.cyan());
        } else {
            log::warn!("Project \"{}\" is not registered", alias);
        }
    }
    Ok(0)
}

/// `--path <alias>`: prints the registered path.
pub fn handle_path(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let alias = cli.project_path.as_deref().unwrap_or_default();
    let path = ctx
        .project_path(alias)
        .ok_or_else(|| anyhow!("Project \"{}\" is not registered", alias))?;
    println!("{}", path);
    Ok(0)
}
