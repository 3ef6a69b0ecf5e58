//! Platform media boundary.
//!
//! The session never touches hardware directly; it talks to these traits.
//! A backend hands out streams, a stream exposes its video track's
//! capabilities and frames, and a recorder turns the stream into encoded
//! chunks delivered through [`RecorderEvent`]s.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::types::{
    DeviceError, Frame, Resolution, SessionError, StreamConstraints, TrackCapabilities,
    TrackConstraint,
};

/// Source of capture streams.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Request camera (and microphone) access.
    ///
    /// May suspend for as long as the platform shows a permission prompt.
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError>;
}

/// A live capture stream holding hardware tracks.
pub trait MediaStream: Send + Sync {
    /// Backend-assigned identifier, unique per acquisition.
    fn id(&self) -> u64;

    /// Negotiated video resolution.
    fn resolution(&self) -> Resolution;

    /// Capabilities of the first video track.
    fn capabilities(&self) -> TrackCapabilities;

    /// Apply a constraint to the first video track.
    fn apply_constraint(&mut self, constraint: TrackConstraint) -> Result<(), SessionError>;

    /// The frame currently being displayed, at native resolution.
    fn current_frame(&self) -> Option<Frame>;

    /// Create a recorder bound to this stream.
    fn create_recorder(&self, mime: &str) -> Result<Box<dyn MediaRecorder>, SessionError>;

    /// Stop every track; the stream is unusable afterwards.
    fn stop_all_tracks(&mut self);
}

/// Events emitted by a recorder.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// An encoded chunk of media (may be empty)
    DataAvailable(Vec<u8>),
    /// The recorder has flushed its last chunk
    Stopped,
}

/// Encodes a stream into media chunks.
pub trait MediaRecorder: Send {
    /// Begin recording; chunks and the final stop event go to `events`.
    fn start(&mut self, events: UnboundedSender<RecorderEvent>) -> Result<(), SessionError>;

    /// Request a stop. The `Stopped` event arrives later.
    fn stop(&mut self);

    fn is_active(&self) -> bool;

    /// Container MIME type of the produced chunks.
    fn mime(&self) -> &str;
}
