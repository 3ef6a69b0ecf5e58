//! Configuration file handling for cinematic-camera.
//!
//! Loads configuration from `~/.config/cinematic-camera/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::overlay::Orientation;
use crate::session::{
    Facing, Resolution, SessionSettings, DEFAULT_JPEG_QUALITY, DEFAULT_RECORDER_MIME,
};
use crate::shell_cache::SHELL_ASSETS;
use crate::store::{OverlayVisibility, SelfTimer, SessionConfig, MIN_ZOOM};

/// Configuration file structure for cinematic-camera.
/// Loaded from ~/.config/cinematic-camera/config.toml (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub viewfinder: ViewfinderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub shell_cache: ShellCacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub facing: Facing,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_recorder_mime")]
    pub recorder_mime: String,
    #[serde(default = "default_true")]
    pub audio: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing: Facing::default(),
            resolution: Resolution::default(),
            jpeg_quality: default_jpeg_quality(),
            recorder_mime: default_recorder_mime(),
            audio: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewfinderConfig {
    #[serde(default = "default_true")]
    pub spiral: bool,
    #[serde(default)]
    pub grid: bool,
    #[serde(default)]
    pub orientation: Orientation,
    /// Seconds: 0, 3, 5 or 10
    #[serde(default)]
    pub timer: SelfTimer,
    #[serde(default = "default_true")]
    pub status_line: bool,
}

impl Default for ViewfinderConfig {
    fn default() -> Self {
        Self {
            spiral: true,
            grid: false,
            orientation: Orientation::default(),
            timer: SelfTimer::default(),
            status_line: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where photos and clips are written (default: picture dir)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellCacheConfig {
    /// Cache root (default: ~/.cache/cinematic-camera/shell)
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
}

impl Default for ShellCacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            assets: default_assets(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_recorder_mime() -> String {
    DEFAULT_RECORDER_MIME.to_string()
}

fn default_assets() -> Vec<String> {
    SHELL_ASSETS.iter().map(|s| s.to_string()).collect()
}

/// Default config written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# cinematic-camera configuration

[camera]
# Which camera to open first: rear or front
facing = "rear"
# Ideal capture resolution (the camera may deliver less)
resolution = { width = 1920, height = 1080 }
# JPEG quality for photos (1-100)
jpeg_quality = 95
# Container requested from the recorder
recorder_mime = "video/webm;codecs=vp9,opus"
# Record sound with clips
audio = true

[viewfinder]
# Golden spiral guide
spiral = true
# Rule-of-thirds grid
grid = false
# Spiral orientation: top-left, top-right, bottom-right, bottom-left
orientation = "top-left"
# Self-timer seconds: 0, 3, 5 or 10
timer = 0
# Print the status line on every change
status_line = true

[output]
# Where photos and clips are written
# directory = "~/Pictures/cinematic-camera"

[shell_cache]
# Cache root for offline shell assets
# directory = "~/.cache/cinematic-camera/shell"
assets = ["/", "/index.html", "/manifest.json", "/app.js", "/app.css", "/icon-512.png"]
"#;

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })
        } else {
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Write the default config to `path`. Refuses to overwrite.
    pub fn init(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Render as TOML for `config show`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            ideal: self.camera.resolution,
            jpeg_quality: self.camera.jpeg_quality.clamp(1, 100),
            recorder_mime: self.camera.recorder_mime.clone(),
            audio: self.camera.audio,
        }
    }

    /// Initial store configuration. Zoom always starts at 1.0.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            facing: self.camera.facing,
            zoom: MIN_ZOOM,
            overlay: OverlayVisibility {
                spiral: self.viewfinder.spiral,
                grid: self.viewfinder.grid,
            },
            orientation: self.viewfinder.orientation,
            self_timer: self.viewfinder.timer,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("cinematic-camera").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/cinematic-camera/config.toml")
        })
}
