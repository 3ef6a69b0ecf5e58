//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{FacingArg, OrientationArg};
use crate::store::SelfTimer;

/// Parse and validate a self-timer delay (0, 3, 5 or 10 seconds)
fn parse_timer(s: &str) -> Result<SelfTimer, String> {
    let seconds: u32 = s
        .trim_end_matches('s')
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    SelfTimer::try_from(seconds)
}

/// Camera viewfinder with composition guides, self-timer and clip recording
#[derive(Parser, Debug)]
#[command(name = "cinematic-camera")]
#[command(version, about = "Cinematic camera viewfinder", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Camera to open first (default: from config, else rear)
    #[arg(long, short)]
    pub facing: Option<FacingArg>,

    /// Self-timer in seconds: 0, 3, 5 or 10
    #[arg(long, short, value_parser = parse_timer)]
    pub timer: Option<SelfTimer>,

    /// Golden spiral orientation
    #[arg(long)]
    pub orientation: Option<OrientationArg>,

    /// Directory for photos and clips
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Simulate a denied camera permission
    #[arg(long)]
    pub deny_permission: bool,

    /// Simulate a camera without zoom
    #[arg(long)]
    pub no_zoom: bool,

    /// Simulate a camera without autofocus
    #[arg(long)]
    pub no_focus: bool,

    /// Don't print the status line on changes
    #[arg(long)]
    pub no_status: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Offline shell cache management
    ShellCache {
        #[command(subcommand)]
        action: ShellCacheAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ShellCacheAction {
    /// Precache the shell from an origin and drop old cache generations
    Install {
        /// Origin serving the shell (e.g. https://camera.example.com)
        origin: String,
    },
    /// List cached entries
    List,
    /// Remove every cached entry
    Clear,
}
