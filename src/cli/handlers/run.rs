// src/cli/handlers/run.rs

use crate::{
    cli::{Cli, handlers::{commons, list}},
    constants::VERSION,
    context::RunContext,
    core::{
        manifest::ManifestError,
        passthrough,
        script_runner::{ScriptOptions, ScriptRunner},
    },
    system::{executor::global_package_root, shell::discover_shell},
};
use anyhow::{Result, bail};

/// Default mode: runs a manifest script, or forwards a package manager subcommand.
///
/// Without any words the available scripts are listed.
pub fn handle(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    if cli.words.is_empty() {
        return list::handle_list(cli, ctx);
    }

    let invocation = ctx.resolve(&cli.words, cli.path_override.as_deref())?;
    let script = invocation.script.as_str();
    let located = match commons::effective_manifest(
        cli,
        invocation.project,
        &invocation.defaults.manifest_overrides,
    ) {
        Ok(located) => located,
        Err(e) => {
            if !matches!(e, ManifestError::NotFound(_)) {
                log::warn!("{}", e);
            }
            return match passthrough::forward(
                ctx.launcher.as_ref(),
                script,
                &invocation.args,
                &invocation.working_dir,
                VERSION,
            )? {
                Some(code) => Ok(code),
                None => Err(e.into()),
            };
        }
    };

    if !located.manifest.scripts.contains_key(script) {
        log::debug!("No script '{}' in {}, trying passthrough", script, located.root.display());
        return match passthrough::forward(
            ctx.launcher.as_ref(),
            script,
            &invocation.args,
            &located.root,
            VERSION,
        )? {
            Some(code) => Ok(code),
            None => bail!("Script '{}' does not exist", script),
        };
    }

    let options = ScriptOptions {
        skip_default_env: cli.no_defaults,
        silence_pipes: cli.no_pipes,
        force_pipes: cli.force_pipes,
        auth_token: commons::auth_token(cli, ctx),
        verbose: cli.verbose,
    };
    let shell = discover_shell()?;
    let runner = ScriptRunner {
        launcher: ctx.launcher.as_ref(),
        notifier: &ctx.notifier,
        shell: &shell,
        manifest: &located.manifest,
        root: &located.root,
        env_defaults: &invocation.defaults.env_defaults,
        pipes: &invocation.defaults.pipes,
        options: &options,
        global_bin: global_package_root(&located.root),
    };
    Ok(runner.run(script, &invocation.args)?)
}

/// `-n <subcommand> [args…]`: forwards straight to the package manager.
pub fn handle_npm(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    let invocation = ctx.resolve(&cli.words, cli.path_override.as_deref())?;
    let code = passthrough::run_package_manager(
        ctx.launcher.as_ref(),
        &invocation.requested,
        &invocation.args,
        &invocation.working_dir,
        VERSION,
    )?;
    Ok(code)
}
