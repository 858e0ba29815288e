// src/cli/handlers/mod.rs

// One module per user-facing mode. Every handler has the signature
// `fn(&Cli, &mut RunContext) -> Result<i32>` and returns the exit code.

pub mod alias;
pub mod chains;
pub mod commons;
pub mod exec;
pub mod info;
pub mod list;
pub mod personal;
pub mod projects;
pub mod run;
