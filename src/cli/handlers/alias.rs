// src/cli/handlers/alias.rs

use crate::{
    cli::{Cli, handlers::commons},
    context::RunContext,
    core::{commons::append_args, interpolator::substitute_str},
    system::{executor::LaunchSpec, shell::discover_shell},
};
use anyhow::{Result, anyhow, bail};
use colored::Colorize;

/// `-a <name> [args…]`: runs `alias[name]` from the global document through the shell.
///
/// `{{vars}}` in the alias are filled in and the remaining words are appended,
/// shell-quoted.
pub fn handle(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let Some((name, extra)) = cli.words.split_first() else {
        bail!("Usage: nrun -a <alias> [args...]");
    };
    let invocation = ctx.resolve(&[], cli.path_override.as_deref())?;
    let template = commons::global_document(ctx)?
        .alias
        .get(name)
        .cloned()
        .ok_or_else(|| anyhow!("Alias '{}' does not exist", name))?;

    let command_line = append_args(&substitute_str(&template, &invocation.defaults.vars), extra);
    if cli.verbose {
        println!("{} {}", "→".blue(), command_line.green());
    }

    let shell = discover_shell()?;
    let env = commons::base_env(cli, ctx).finish();
    let spec = LaunchSpec::shell(&shell, &command_line, &invocation.working_dir, env);
    let code = ctx.launcher.launch(&spec)?;
    if code != 0 {
        ctx.notifier.notify(format!("Process failed with error-code {}", code));
    }
    Ok(code)
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
    fn test_alias_fills_vars_and_appends_words() {
        // --- Setup ---
        let home = tempdir().unwrap();
        fs::write(
            home.path().join(".nrun.json"),
            r#"{"alias": {"up": "docker compose -f {{file}} up"}, "vars": {"file": "dev.yml"}}"#,
        )
        .unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let mut ctx = context(home.path(), home.path(), &launcher);
        let cli = Cli {
            alias: true,
            words: words(&["up", "web db"]),
            ..Default::default()
        };

        // --- Execute ---
        let code = handle(&cli, &mut ctx).unwrap();

        // --- Assert ---
        assert_eq!(code, 0);
        assert_eq!(launcher.commands(), vec!["docker compose -f dev.yml up 'web db'"]);
    }

    #[test]
    fn test_unknown_alias_is_an_error() {
        let home = tempdir().unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let mut ctx = context(home.path(), home.path(), &launcher);
        let cli = Cli {
            alias: true,
            words: words(&["nope"]),
            ..Default::default()
        };
        assert!(handle(&cli, &mut ctx).is_err());
    }
}
