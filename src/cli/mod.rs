//! Command-line interface: argument parsing, value enums and the `config` /
//! `shell-cache` subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, ShellCacheAction};
pub use commands::{apply_overrides, handle_config_action, handle_shell_cache_action};
pub use enums::{FacingArg, OrientationArg};
