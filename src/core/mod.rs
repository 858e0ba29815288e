// src/core/mod.rs

pub mod chain_executor;
pub mod commons;
pub mod config_resolver;
pub mod config_store;
pub mod directive;
pub mod interpolator;
pub mod manifest;
pub mod passthrough;
pub mod paths;
pub mod script_runner;
