//! # nrun
//!
//! Runs `package.json` scripts with defaults layered from a global and a local
//! `.nrun.json`: script-name defaults, per-script environments, variables, manifest
//! overrides and directive-aware script chains.

pub mod cli;
pub mod constants;
pub mod context;
pub mod core;
pub mod models;
pub mod system;
