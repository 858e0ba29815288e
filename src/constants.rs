// src/constants.rs

/// The name of the configuration file, both in the home directory (global)
/// and in the working directory (local).
pub const CONFIG_FILENAME: &str = ".nrun.json";

/// Suffix appended to the configuration file name for the copy taken before any mutation.
pub const BACKUP_SUFFIX: &str = ".bak";

/// The project manifest looked up from the working directory upwards.
pub const MANIFEST_FILENAME: &str = "package.json";

/// How many parent directories are searched for a manifest before giving up.
pub const MAX_MANIFEST_DEPTH: usize = 100;

/// Project-local directory of installed executables, prefixed onto `PATH`.
pub const LOCAL_BIN_DIR: &str = "node_modules/.bin";

/// The package manager that unknown script names are forwarded to.
pub const PACKAGE_MANAGER: &str = "npm";

/// Environment variable used as a fallback for `--path-override`.
pub const PROJECT_ENV_VAR: &str = "NRUNPROJECT";

/// Any environment assignment starting with this prefix replaces the same key
/// (with the prefix stripped) in the final child environment.
pub const OVERRIDE_PREFIX: &str = "OVERRIDE_";

/// Environment variable that carries the configured auth token to the child.
pub const AUTH_TOKEN_VAR: &str = "X_AUTH_TOKEN";

/// Prefix of the variables injected into every literal chain element.
pub const CHAIN_ENV_PREFIX: &str = "NRUN_";

/// Marker that turns a chain element into a directive (`@@name:args`).
pub const DIRECTIVE_MARKER: &str = "@@";

/// Capacity of the notification queue. Producers block once it is full.
pub const NOTIFY_QUEUE_CAPACITY: usize = 25;

/// The voice used by the `say` notification backend.
pub const NOTIFY_VOICE: &str = "Daniel";

/// The version reported by `-v` and the `version` passthrough banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
