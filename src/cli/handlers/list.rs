// src/cli/handlers/list.rs

use crate::{
    cli::{Cli, handlers::commons},
    context::RunContext,
    models::{Manifest, ResolvedDefaults},
};
use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;

/// `-l`: lists the scripts, then the default values and default environments.
pub fn handle_list(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let located = commons::effective_manifest(
        cli,
        invocation.project,
        &invocation.defaults.manifest_overrides,
    )?;
    print_listing(&located.manifest, &invocation.defaults);
    Ok(0)
}

/// `-s <script>`: shows one script's body.
pub fn handle_show(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&cli.words, cli.path_override.as_deref())?;
    let located = commons::effective_manifest(
        cli,
        invocation.project,
        &invocation.defaults.manifest_overrides,
    )?;
    match located.manifest.scripts.get(&invocation.script) {
        Some(body) => {
            println!("{} -> {}", invocation.script.cyan(), body);
            Ok(0)
        }
        None => {
            println!("Can't find any script called \"{}\"", invocation.script);
            Ok(1)
        }
    }
}

/// Prints the scripts (sorted) and the effective defaults for the current project.
pub fn print_listing(manifest: &Manifest, defaults: &ResolvedDefaults) {
    println!("The following scripts are available");
    for name in manifest.scripts.keys() {
        println!(" - {}", name.cyan());
    }
    print_section("The following default values are available", &defaults.path_defaults);
    print_section(
        "The following default environment values are available",
        &defaults.env_defaults,
    );
}

fn print_section(title: &str, values: &BTreeMap<String, String>) {
    if values.is_empty() {
        return;
    }
    println!();
    println!("{}", title);
    for (key, value) in values {
        println!(" - {}: {}", key.cyan(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::handlers::commons::testing::{context, words};
    use crate::system::executor::testing::RecordingLauncher;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_show_uses_path_default_and_override() {
        // --- Setup ---
        let home = tempdir().unwrap();
        let project = tempdir().unwrap();
        fs::write(project.path().join("package.json"), r#"{"scripts": {"start": "node ."}}"#).unwrap();
        fs::write(
            home.path().join(".nrun.json"),
            format!(
                r#"{{
                    "path": {{"*": {{"serve": "start"}}}},
                    "packageJSONOverride": {{"{}": {{"scripts": {{"start": "node server.js"}}}}}}
                }}"#,
                project.path().display()
            ),
        )
        .unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let mut ctx = context(home.path(), project.path(), &launcher);
        let cli = Cli {
            show: true,
            words: words(&["serve"]),
            ..Default::default()
        };

        // --- Execute & Assert ---
        assert_eq!(handle_show(&cli, &mut ctx).unwrap(), 0);
        assert!(launcher.specs().is_empty());
    }

    #[test]
    fn test_show_missing_script_returns_one() {
        let home = tempdir().unwrap();
        let project = tempdir().unwrap();
        fs::write(project.path().join("package.json"), "{}").unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let mut ctx = context(home.path(), project.path(), &launcher);
        let cli = Cli {
            show: true,
            words: words(&["missing"]),
            ..Default::default()
        };
        assert_eq!(handle_show(&cli, &mut ctx).unwrap(), 1);
    }

    #[test]
    fn test_list_requires_a_manifest() {
        let home = tempdir().unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let mut ctx = context(home.path(), home.path(), &launcher);
        let cli = Cli {
            list: true,
            ..Default::default()
        };
        assert!(handle_list(&cli, &mut ctx).is_err());
    }
}
