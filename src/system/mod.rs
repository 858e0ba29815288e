//! # System Interaction Layer
//!
//! Abstractions over the operating system, kept apart from the resolution logic.
//!
//! ## Modules
//!
//! - **`executor`**: starts child processes behind the `ProcessLauncher` trait and
//!   builds their environment (overrides, `PATH` prefixes, auth token).
//! - **`notifier`**: a bounded background queue that speaks failure messages.
//! - **`shell`**: picks the shell used for `-c` command lines.

pub mod executor;
pub mod notifier;
pub mod shell;
