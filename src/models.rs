// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

// --- `.nrun.json` MODELS (What is read from the configuration file) ---

/// Mapping of selector (`*` or a project path) to a mapping of script name to value.
pub type ScopedMap = BTreeMap<String, BTreeMap<String, String>>;

/// Represents the deserialized structure of a `.nrun.json` file.
///
/// Every field is optional and defaults to an empty mapping. Maps are ordered so
/// that rewriting the file produces stable, key-sorted output. Fields this version
/// does not know about are kept in `extra` and written back untouched.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ConfigDocument {
    /// `selector -> script -> "KEY=VALUE ..."` environment assignments.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: ScopedMap,
    /// `selector -> raw script name -> effective script name`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub path: ScopedMap,
    /// Flat `{{name}}` replacement table.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
    /// Registered project aliases and their absolute paths.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, String>,
    /// Shell one-liners runnable with `-a <name>`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub alias: BTreeMap<String, String>,
    /// Script chains: ordered commands and `@@` directives.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, Vec<String>>,
    /// `selectors -> script -> pipe stages`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pipes: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// `selectors -> partial manifest`. Only the `scripts` sub-map is applied.
    #[serde(
        rename = "package.json",
        alias = "packageJSONOverride",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub package_json_override: BTreeMap<String, Value>,
    #[serde(rename = "webget", skip_serializing_if = "BTreeMap::is_empty")]
    pub webget_templates: BTreeMap<String, WebGetTemplate>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub xauthtokens: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub personalflags: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tokentemplates: BTreeMap<String, String>,
    /// Unknown top-level fields, preserved across rewrites.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A named web request template. Carried as data only; `{{vars}}` are applied to it
/// like any other layered value.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct WebGetTemplate {
    pub method: String,
    pub url: String,
    pub format: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
    pub xauthtoken: String,
    pub flags: BTreeMap<String, Value>,
}

// --- `package.json` MODEL ---

/// The subset of a project manifest the runner needs. Everything else is carried
/// through `rest` unmodified.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

// --- RESOLUTION MODELS ---

/// A single token of a comma-separated rule key, deciding whether the rule applies
/// to the current project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `*`: applies everywhere.
    Wildcard,
    /// A literal project path.
    ExactPath(PathBuf),
    /// `@name`: the path registered under `projects[name]`.
    ProjectAlias(String),
}

/// The effective, merged layers for one project path. Produced once per run by the
/// default resolver and then passed through variable substitution.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ResolvedDefaults {
    /// Raw script name -> effective script name.
    pub path_defaults: BTreeMap<String, String>,
    /// Script name -> environment assignment string.
    pub env_defaults: BTreeMap<String, String>,
    pub projects: BTreeMap<String, String>,
    pub chains: BTreeMap<String, Vec<String>>,
    pub vars: BTreeMap<String, String>,
    /// Accumulated manifest overrides (only `scripts` today).
    pub manifest_overrides: BTreeMap<String, String>,
    pub pipes: BTreeMap<String, Vec<String>>,
}

// --- CHAIN MODELS ---

/// One element of a script chain, parsed once before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainElement {
    /// A shell command line, run with `shell -c`.
    Literal(String),
    /// An `@@[!]name:args` directive, interpreted in-process.
    Directive { negated: bool, directive: Directive },
}

/// The directive mini-language understood by the chain executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Passes when at least one of the paths exists.
    HasFile(Vec<String>),
    /// Passes when every path exists.
    HasFiles(Vec<String>),
    Cd(String),
    /// `key=value`, applied to every later element of the chain.
    Set(String),
    Unset(String),
    Echo(String),
    IsFile(String),
    IsDir(String),
    /// Anything else. Terminates the chain.
    Unknown(String),
}

impl Directive {
    /// Whether the directive is a pass/fail guard that may terminate the chain.
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            Self::HasFile(_) | Self::HasFiles(_) | Self::IsFile(_) | Self::IsDir(_)
        )
    }
}
