//! Artifact delivery.
//!
//! Every capture action hands its artifact to an [`ArtifactSink`] exactly
//! once. The sink returns a locator the UI keeps as the last artifact.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::session::Artifact;

/// Filename prefix for delivered artifacts.
pub const FILE_PREFIX: &str = "cinematic";

/// Errors that can occur while delivering an artifact.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for produced photos and clips.
pub trait ArtifactSink: Send + Sync {
    /// Persist the artifact and return where it went.
    fn deliver(&self, artifact: &Artifact) -> Result<String, DeliveryError>;
}

/// Build the download name for an artifact taken at `millis`.
///
/// Format: `cinematic_{photo|video}_<millis>.<ext>`
pub fn artifact_file_name(artifact: &Artifact, millis: u64) -> String {
    format!(
        "{}_{}_{}.{}",
        FILE_PREFIX,
        artifact.kind.name(),
        millis,
        artifact.extension()
    )
}

/// Writes artifacts as files into a directory.
///
/// Timestamps are strictly increasing per sink, so two artifacts delivered
/// within the same millisecond still get distinct, ordered names.
pub struct DirectorySink {
    dir: PathBuf,
    last_millis: Mutex<u64>,
}

impl DirectorySink {
    /// Create a sink; the directory is created on first delivery.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_millis: Mutex::new(0),
        }
    }

    /// Default output directory: the user's picture directory, or `./captures`.
    pub fn default_dir() -> PathBuf {
        dirs::picture_dir()
            .map(|d| d.join("cinematic-camera"))
            .unwrap_or_else(|| PathBuf::from("captures"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_millis(&self, artifact: &Artifact) -> u64 {
        let now = artifact
            .created_at
            .duration_since(UNIX_EPOCH)
            .or_else(|_| SystemTime::now().duration_since(UNIX_EPOCH))
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        match self.last_millis.lock() {
            Ok(mut last) => {
                let millis = now.max(*last + 1);
                *last = millis;
                millis
            }
            Err(_) => now,
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&self, artifact: &Artifact) -> Result<String, DeliveryError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| DeliveryError::CreateDir {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self
            .dir
            .join(artifact_file_name(artifact, self.next_millis(artifact)));
        std::fs::write(&path, &artifact.data).map_err(|e| DeliveryError::Write {
            path: path.clone(),
            source: e,
        })?;

        log::info!(
            "Saved {} ({} bytes) to {}",
            artifact.kind.name(),
            artifact.data.len(),
            path.display()
        );
        Ok(path.display().to_string())
    }
}
