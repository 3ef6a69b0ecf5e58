use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;

use cinematic_camera::cli::{
    apply_overrides, handle_config_action, handle_shell_cache_action, Args, Command,
};
use cinematic_camera::config::Config;
use cinematic_camera::coordinator::CaptureCoordinator;
use cinematic_camera::delivery::DirectorySink;
use cinematic_camera::event_loop::{self, setup_ctrlc_handler};
use cinematic_camera::hud::StatusLine;
use cinematic_camera::session::{DeviceSession, SyntheticBackend, SyntheticOptions};
use cinematic_camera::store::Store;

type MainResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Load the config file.
///
/// An explicit `--config` must load; a broken default file only warns.
fn load_config(path: Option<&Path>) -> Config {
    match (path, Config::load(path)) {
        (_, Ok(config)) => config,
        (Some(_), Err(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        (None, Err(e)) => {
            eprintln!("Warning: {}", e);
            eprintln!("Using default settings.\n");
            Config::default()
        }
    }
}

async fn run_viewfinder(args: &Args, config: Config) -> MainResult {
    let backend = Arc::new(SyntheticBackend::new(SyntheticOptions {
        deny_permission: args.deny_permission,
        zoom: if args.no_zoom {
            None
        } else {
            SyntheticOptions::default().zoom
        },
        focus: !args.no_focus,
        ..SyntheticOptions::default()
    }));

    let session = DeviceSession::new(backend, config.session_settings());
    let store = Store::new(config.session_config());
    let output = config
        .output
        .directory
        .clone()
        .unwrap_or_else(DirectorySink::default_dir);
    log::info!("Saving captures to {}", output.display());

    let mut coordinator = CaptureCoordinator::new(
        store,
        Arc::new(Mutex::new(session)),
        Arc::new(DirectorySink::new(output)),
    );

    let interrupts = setup_ctrlc_handler()?;

    if coordinator.start().await.is_none() {
        eprintln!("Camera unavailable. Type 'retry' to try again.");
    }
    println!("Type 'help' for commands.");

    let status_line = StatusLine::with_visibility(config.viewfinder.status_line);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    event_loop::run(&mut coordinator, stdin, interrupts, &status_line).await
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = match &args.command {
        Some(Command::Config { action }) => {
            handle_config_action(action.clone(), args.config.as_deref())
        }
        Some(Command::ShellCache { action }) => {
            let config = load_config(args.config.as_deref());
            runtime.block_on(handle_shell_cache_action(action.clone(), &config))
        }
        None => {
            let mut config = load_config(args.config.as_deref());
            apply_overrides(&mut config, &args);
            runtime.block_on(run_viewfinder(&args, config))
        }
    };

    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_background();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
