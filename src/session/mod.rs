//! Device session module: camera stream ownership and capture primitives.
//!
//! - The media boundary via [`MediaBackend`], [`MediaStream`], [`MediaRecorder`]
//! - Stream lifetime and capture via [`DeviceSession`]
//! - A hardware-free camera via [`SyntheticBackend`]

mod backend;
mod encode;
mod manager;
mod synthetic;
mod types;

pub use backend::{MediaBackend, MediaRecorder, MediaStream, RecorderEvent};
pub use encode::{encode_jpeg, DEFAULT_JPEG_QUALITY, PHOTO_MIME};
pub use manager::{
    DeviceSession, PendingClip, SessionSettings, SessionState, DEFAULT_RECORDER_MIME,
};
pub use synthetic::{Probe, ProbeState, SyntheticBackend, SyntheticOptions};
pub use types::{
    Artifact, ArtifactKind, DeviceError, Facing, FocusMode, Frame, Resolution, SessionError,
    StreamConstraints, StreamHandle, TrackCapabilities, TrackConstraint, ZoomRange,
};
