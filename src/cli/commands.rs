//! Subcommand handlers for config and shell-cache actions.

use std::path::{Path, PathBuf};

use super::args::{Args, ConfigAction, ShellCacheAction};
use crate::config::{default_path as get_config_path, Config};
use crate::shell_cache::{HttpFetcher, ShellCache};

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Fold command-line flags over the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(facing) = args.facing {
        config.camera.facing = facing.into();
    }
    if let Some(timer) = args.timer {
        config.viewfinder.timer = timer;
    }
    if let Some(orientation) = args.orientation {
        config.viewfinder.orientation = orientation.into();
    }
    if let Some(output) = &args.output {
        config.output.directory = Some(output.clone());
    }
    if args.no_status {
        config.viewfinder.status_line = false;
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) -> CommandResult {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(&config_path))?;
            println!("Current configuration:");
            println!();
            println!("{}", config.to_toml()?);

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            Config::init(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

/// Handle shell-cache subcommand actions.
pub async fn handle_shell_cache_action(action: ShellCacheAction, config: &Config) -> CommandResult {
    let root = config
        .shell_cache
        .directory
        .clone()
        .unwrap_or_else(ShellCache::<HttpFetcher>::default_root);

    match action {
        ShellCacheAction::Install { origin } => {
            let cache = ShellCache::new(&root, HttpFetcher::new(origin)?);
            let assets: Vec<&str> = config.shell_cache.assets.iter().map(String::as_str).collect();

            let count = cache.install(&assets).await?;
            println!("Cached {} shell assets in {}", count, cache.dir().display());

            for old in cache.activate()? {
                println!("Removed old cache: {}", old);
            }
        }
        ShellCacheAction::List => {
            let cache = ShellCache::new(&root, HttpFetcher::new("")?);
            let entries = cache.list()?;
            if entries.is_empty() {
                println!("Shell cache is empty ({}).", cache.dir().display());
            } else {
                println!("Cached shell assets ({}):", cache.name());
                for entry in entries {
                    println!(
                        "  {:<24} {:>4} {:>9} bytes  {}",
                        entry.path,
                        entry.status,
                        entry.size,
                        entry.content_type.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        ShellCacheAction::Clear => {
            let cache = ShellCache::new(&root, HttpFetcher::new("")?);
            let removed = cache.clear()?;
            println!("Removed {} cached entries", removed);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Orientation;
    use crate::session::Facing;
    use crate::store::SelfTimer;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from([
            "cinematic-camera",
            "--facing",
            "front",
            "--timer",
            "3",
            "--orientation",
            "top-right",
            "--output",
            "/tmp/shots",
            "--no-status",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.camera.facing, Facing::Front);
        assert_eq!(config.viewfinder.timer, SelfTimer::Three);
        assert_eq!(config.viewfinder.orientation, Orientation::TopRight);
        assert_eq!(config.output.directory, Some(PathBuf::from("/tmp/shots")));
        assert!(!config.viewfinder.status_line);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["cinematic-camera"]);
        let mut config = Config::default();
        config.camera.facing = Facing::Front;
        apply_overrides(&mut config, &args);
        assert_eq!(config.camera.facing, Facing::Front);
    }

    #[test]
    fn test_config_init_then_show() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        handle_config_action(ConfigAction::Init, Some(&path)).unwrap();
        assert!(path.exists());
        handle_config_action(ConfigAction::Show, Some(&path)).unwrap();
        assert!(handle_config_action(ConfigAction::Init, Some(&path)).is_err());
    }
}
