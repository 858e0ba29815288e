// src/cli/handlers/info.rs

use crate::{cli::Cli, context::RunContext, core::paths::display_path};
use anyhow::Result;
use colored::Colorize;

/// `-i`: prints the root of the current project.
pub fn handle(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let located = invocation.project?;
    println!("Current project is {}", display_path(&located.root).cyan());
    if let Some(name) = &located.manifest.name {
        log::debug!("Package name: {}", name);
    }
    Ok(0)
}
