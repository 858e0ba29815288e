// src/cli/handlers/commons.rs

// Shared functions used by multiple handlers.

use crate::{
    cli::Cli,
    context::RunContext,
    core::{
        chain_executor::{ChainError, ChainOutcome},
        manifest::{self, LocatedManifest, ManifestError},
    },
    models::ConfigDocument,
    system::executor::EnvBuilder,
};
use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;

/// The global document, or an empty one when the file does not exist yet.
pub fn global_document(ctx: &mut RunContext) -> Result<ConfigDocument> {
    let path = ctx.global_config_path.clone();
    match ctx.store.read(&path) {
        Ok(document) => Ok(document.clone()),
        Err(e) if e.is_not_found() => Ok(ConfigDocument::default()),
        Err(e) => Err(e.into()),
    }
}

/// Resolves `--xat`: a name from `xauthtokens`, otherwise the literal token.
pub fn auth_token(cli: &Cli, ctx: &mut RunContext) -> Option<String> {
    let requested = cli.auth_token.as_deref()?;
    let global = ctx.global_config_path.clone();
    let named = ctx
        .store
        .read_layer(&global)
        .and_then(|doc| doc.xauthtokens.get(requested).cloned());
    Some(named.unwrap_or_else(|| requested.to_string()))
}

/// Inherited environment plus the auth token, for chains and plain commands.
pub fn base_env(cli: &Cli, ctx: &mut RunContext) -> EnvBuilder {
    let mut env = EnvBuilder::inherited();
    if let Some(token) = auth_token(cli, ctx) {
        env.push(crate::constants::AUTH_TOKEN_VAR, token);
    }
    env
}

/// The located manifest with `packageJSONOverride` scripts merged in, unless `--npo`.
pub fn effective_manifest(
    cli: &Cli,
    project: Result<LocatedManifest, ManifestError>,
    overrides: &BTreeMap<String, String>,
) -> Result<LocatedManifest, ManifestError> {
    let mut located = project?;
    if !cli.no_package_override {
        manifest::apply_overrides(&mut located.manifest, overrides);
    }
    Ok(located)
}

/// Drops a leading `--` separator.
pub fn strip_separator(words: &[String]) -> &[String] {
    match words.split_first() {
        Some((first, rest)) if first == "--" => rest,
        _ => words,
    }
}

/// Turns a chain result into an exit code, reporting failures.
pub fn report_chain_result(
    name: &str,
    result: &Result<ChainOutcome, ChainError>,
    ctx: &RunContext,
) -> i32 {
    match result {
        Ok(ChainOutcome::Completed) => 0,
        Ok(ChainOutcome::Halted { step, reason }) => {
            log::debug!("Chain '{}' halted at step {}: {}", name, step, reason);
            0
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            match e.exit_code() {
                Some(code) => {
                    ctx.notifier
                        .notify(format!("Process failed with error-code {}", code));
                    code
                }
                None => 1,
            }
        }
    }
}

/// The first non-zero code, or zero.
pub fn first_failure(codes: impl IntoIterator<Item = i32>) -> i32 {
    codes.into_iter().find(|code| *code != 0).unwrap_or(0)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_separator() {
        let words = vec!["--".to_string(), "ls".to_string(), "--".to_string()];
        assert_eq!(strip_separator(&words), &words[1..]);
        assert_eq!(strip_separator(&words[1..]), &words[1..]);
        assert!(strip_separator(&[]).is_empty());
    }

    #[test]
    fn test_first_failure() {
        assert_eq!(first_failure([0, 0, 3, 4]), 3);
        assert_eq!(first_failure([]), 0);
    }
}
