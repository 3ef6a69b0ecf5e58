//! Session types and data structures.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Which physical camera is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Front-facing (selfie) camera
    Front,
    /// Rear-facing (world) camera
    #[default]
    Rear,
}

impl Facing {
    /// The other camera.
    pub fn toggled(self) -> Self {
        match self {
            Facing::Front => Facing::Rear,
            Facing::Rear => Facing::Front,
        }
    }

    /// Platform facing-mode constraint value.
    pub fn constraint(&self) -> &'static str {
        match self {
            Facing::Front => "user",
            Facing::Rear => "environment",
        }
    }

    /// Get a human-readable name for the facing mode.
    pub fn name(&self) -> &'static str {
        match self {
            Facing::Front => "front",
            Facing::Rear => "rear",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stream resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Full HD (1920x1080) - ideal capture target
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What is requested from the platform when acquiring a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConstraints {
    pub facing: Facing,
    /// Ideal (not exact) video resolution
    pub ideal: Resolution,
    /// Request a microphone track alongside the camera
    pub audio: bool,
}

/// Zoom range advertised by a video track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    /// Clamp a requested factor into the advertised range.
    ///
    /// Inverted bounds are swapped and NaN bounds are ignored, so a
    /// misreporting track never panics.
    pub fn clamp(&self, factor: f64) -> f64 {
        let (low, high) = if self.min > self.max {
            (self.max, self.min)
        } else {
            (self.min, self.max)
        };
        factor.max(low).min(high)
    }
}

/// Focus modes a video track may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Continuous,
    SingleShot,
    Manual,
}

/// Optional hardware features of the active video track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackCapabilities {
    pub zoom: Option<ZoomRange>,
    pub focus_modes: Vec<FocusMode>,
}

impl TrackCapabilities {
    pub fn supports_focus(&self, mode: FocusMode) -> bool {
        self.focus_modes.contains(&mode)
    }
}

/// A constraint applied to a live video track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackConstraint {
    Zoom(f64),
    FocusMode(FocusMode),
}

/// Public description of the stream held by the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamHandle {
    /// Backend-assigned stream id
    pub id: u64,
    pub facing: Facing,
    /// Negotiated resolution (may differ from the ideal)
    pub resolution: Resolution,
}

/// A raw RGB video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel data, 3 bytes per pixel, row-major
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Whether the buffer length matches the dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }
}

/// Kind of produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Photo,
    Video,
}

impl ArtifactKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Photo => "photo",
            ArtifactKind::Video => "video",
        }
    }
}

/// A produced photo or video, ready for delivery.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// MIME type of `data`
    pub mime: String,
    pub data: Vec<u8>,
    pub created_at: SystemTime,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind,
            mime: mime.into(),
            data,
            created_at: SystemTime::now(),
        }
    }

    /// File extension for the artifact's container.
    ///
    /// Codec parameters (`;codecs=...`) are ignored.
    pub fn extension(&self) -> &'static str {
        let essence = self.mime.split(';').next().unwrap_or("").trim();
        match essence {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            _ => match self.kind {
                ArtifactKind::Photo => "jpg",
                ArtifactKind::Video => "mp4",
            },
        }
    }
}

/// Errors reported by the platform when acquiring a stream.
///
/// These are the only failures surfaced to the user (with a retry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum DeviceError {
    #[error("Camera or microphone permission denied. Please check permissions.")]
    PermissionDenied,

    #[error("Camera not available: {0}")]
    NotAvailable(String),
}

/// Errors from session operations other than acquisition.
///
/// None of these reach the user; the coordinator logs and absorbs them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Track does not support {0}")]
    CapabilityUnsupported(&'static str),

    #[error("No active stream to record from")]
    RecorderUnavailable,

    #[error("No active stream")]
    NoActiveStream,

    #[error("No frame available yet")]
    NoFrame,

    #[error("Recorder finished without a stop event")]
    RecorderAborted,

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Failed to encode still frame: {0}")]
    Encode(String),
}
