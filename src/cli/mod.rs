// src/cli/mod.rs

use clap::{ArgAction, Parser};

pub mod dispatcher;
pub mod handlers;

/// nrun: runs package.json scripts with layered defaults.
///
/// Without a mode flag the first word is a script from the closest package.json,
/// and the remaining words are passed to it. Unknown names that are npm
/// subcommands (`install`, `test`, …) are forwarded to npm.
///
/// Defaults come from `~/.nrun.json` and `./.nrun.json`: `path` maps script names
/// to other script names, `env` adds environment assignments, `vars` fills
/// `{{name}}` placeholders, and `scripts` holds chains run with `-x`.
#[derive(Parser, Debug, Default)]
#[command(name = "nrun", author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Script, chain, alias or program name, followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,

    /// Print version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    // --- Inspection ---
    /// List scripts, default values and default environments.
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Show the body of one script.
    #[arg(short = 's', long = "show")]
    pub show: bool,

    /// Show the current project root.
    #[arg(short = 'i', long = "info")]
    pub info: bool,

    /// Be verbose: show the commands, environments and paths used.
    #[arg(short = 'V', long = "verbose")]
    pub verbose: bool,

    /// Print the elapsed time on exit.
    #[arg(short = 'T', long = "time")]
    pub time: bool,

    // --- Resolution ---
    /// Use another path (or a registered project alias) to find the package.json.
    #[arg(short = 'p', long = "path-override", value_name = "PATH|ALIAS")]
    pub path_override: Option<String>,

    /// Do not add the per-script default environment.
    #[arg(short = 'D', long = "no-defaults", visible_alias = "ndv")]
    pub no_defaults: bool,

    /// Do not apply package.json overrides from the configuration.
    #[arg(long = "no-package-override", visible_alias = "npo")]
    pub no_package_override: bool,

    /// Do not warn about configured pipes.
    #[arg(long = "no-pipes", visible_alias = "np")]
    pub no_pipes: bool,

    /// Refuse to run scripts that have pipes configured.
    #[arg(long = "force-pipes", visible_alias = "fp")]
    pub force_pipes: bool,

    /// Set X_AUTH_TOKEN, by name from `xauthtokens` or literally.
    #[arg(long = "auth-token", visible_alias = "xat", value_name = "NAME|TOKEN")]
    pub auth_token: Option<String>,

    /// Set a template variable, overriding `vars`.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    // --- Execution modes ---
    /// Pass the words straight through to npm.
    #[arg(short = 'n', long = "npm")]
    pub npm: bool,

    /// Execute an alias from the global configuration.
    #[arg(short = 'a', long = "alias")]
    pub alias: bool,

    /// Execute a program in the project root.
    #[arg(short = 'e', long = "exec")]
    pub exec: bool,

    /// Execute a program in every registered project.
    #[arg(long = "exec-projects", visible_alias = "ep")]
    pub exec_projects: bool,

    /// Execute a chain.
    #[arg(short = 'x', long = "chain")]
    pub chain: bool,

    /// Execute a chain in every registered project.
    #[arg(long = "chain-projects", visible_alias = "xp")]
    pub chain_projects: bool,

    /// Execute several chains concurrently.
    #[arg(long = "chains", visible_alias = "xm")]
    pub chains: bool,

    /// Run the commands of a personal flag from `personalflags`.
    #[arg(long = "personal-flag", visible_alias = "pf", value_name = "NAME")]
    pub personal_flag: Option<String>,

    // --- Chain management ---
    /// List chains.
    #[arg(long = "list-chains", visible_alias = "xl")]
    pub list_chains: bool,

    /// Show one chain.
    #[arg(long = "show-chain", visible_alias = "xs", value_name = "CHAIN")]
    pub show_chain: Option<String>,

    /// Append the words as a command to a chain.
    #[arg(long = "add-chain", visible_alias = "xa", value_name = "CHAIN")]
    pub add_chain: Option<String>,

    /// Remove a chain (and any chains named in the words).
    #[arg(long = "remove-chain", visible_alias = "xr", value_name = "CHAIN")]
    pub remove_chain: Option<String>,

    // --- Project registry ---
    /// List registered projects.
    #[arg(long = "list-projects", visible_alias = "pl")]
    pub list_projects: bool,

    /// Register a project: `--pa <alias> <path>`.
    #[arg(long = "add-project", visible_alias = "pa")]
    pub add_project: bool,

    /// Unregister the projects named in the words.
    #[arg(long = "remove-project", visible_alias = "pr")]
    pub remove_project: bool,

    /// Print the path of a registered project.
    #[arg(long = "project-path", visible_alias = "path", value_name = "ALIAS")]
    pub project_path: Option<String>,
}
