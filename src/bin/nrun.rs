// src/bin/nrun.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use nrun::{
    cli::{Cli, dispatcher},
    context::{RunContext, parse_cli_vars},
    core::commons::format_elapsed,
};
use std::time::Instant;

/// The main entry point of `nrun`.
/// Sets up logging, parses arguments, dispatches to the selected mode and turns the
/// outcome into the process exit code.
fn main() {
    let started = Instant::now();
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let outcome = run_cli(&cli);

    if cli.time {
        println!("\nTime elapsed: {}", format_elapsed(started.elapsed()));
    }

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // --- Centralized Error Handling ---
            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Builds the run context, dispatches, and waits for pending notifications.
fn run_cli(cli: &Cli) -> Result<i32> {
    let cli_vars = parse_cli_vars(&cli.vars)?;
    let mut ctx = RunContext::new(cli_vars)?;
    let result = dispatcher::dispatch(cli, &mut ctx);
    // Queued notifications must be delivered before the process exits.
    ctx.notifier.wait_until_drained();
    result
}
