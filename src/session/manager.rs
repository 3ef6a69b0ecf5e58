//! Device session: exclusive owner of the capture stream.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::backend::{MediaBackend, MediaRecorder, MediaStream, RecorderEvent};
use super::encode::{encode_jpeg, DEFAULT_JPEG_QUALITY, PHOTO_MIME};
use super::types::{
    Artifact, ArtifactKind, DeviceError, Facing, FocusMode, Resolution, SessionError,
    StreamConstraints, StreamHandle, TrackConstraint,
};

/// Default recorder container.
pub const DEFAULT_RECORDER_MIME: &str = "video/webm;codecs=vp9,opus";

/// Lifecycle of the held stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unacquired,
    Acquiring,
    Active,
    Recording,
    Released,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unacquired => "unacquired",
            SessionState::Acquiring => "acquiring",
            SessionState::Active => "active",
            SessionState::Recording => "recording",
            SessionState::Released => "released",
        }
    }
}

/// Settings for a device session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Ideal capture resolution
    pub ideal: Resolution,
    /// JPEG quality for stills (1-100)
    pub jpeg_quality: u8,
    /// Container requested from the recorder
    pub recorder_mime: String,
    /// Request a microphone track
    pub audio: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ideal: Resolution::FULL_HD,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            recorder_mime: DEFAULT_RECORDER_MIME.to_string(),
            audio: true,
        }
    }
}

struct ActiveRecording {
    recorder: Box<dyn MediaRecorder>,
    events: UnboundedReceiver<RecorderEvent>,
}

/// A clip whose recorder has been asked to stop.
///
/// The video artifact exists only once the recorder reports its stop
/// event; await [`PendingClip::finish`] for it.
pub struct PendingClip {
    mime: String,
    events: UnboundedReceiver<RecorderEvent>,
}

impl PendingClip {
    /// Collect the remaining chunks and build the clip.
    ///
    /// Empty chunks are skipped; the rest are concatenated in arrival order.
    pub async fn finish(mut self) -> Result<Artifact, SessionError> {
        let mut data = Vec::new();
        while let Some(event) = self.events.recv().await {
            match event {
                RecorderEvent::DataAvailable(chunk) => {
                    if !chunk.is_empty() {
                        data.extend_from_slice(&chunk);
                    }
                }
                RecorderEvent::Stopped => {
                    log::debug!("Recorder stopped, clip is {} bytes", data.len());
                    return Ok(Artifact::new(ArtifactKind::Video, self.mime, data));
                }
            }
        }
        Err(SessionError::RecorderAborted)
    }
}

impl fmt::Debug for PendingClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingClip")
            .field("mime", &self.mime)
            .finish_non_exhaustive()
    }
}

/// Owns the lifetime of the hardware capture stream.
///
/// At most one stream is held at a time: [`acquire`](Self::acquire) always
/// releases the previous stream before asking the backend for a new one.
/// Hardware failures are converted to state here; nothing above this layer
/// sees a platform error it has to recover from.
pub struct DeviceSession {
    backend: Arc<dyn MediaBackend>,
    settings: SessionSettings,
    stream: Option<Box<dyn MediaStream>>,
    facing: Option<Facing>,
    recording: Option<ActiveRecording>,
    state: SessionState,
    last_error: Option<DeviceError>,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("facing", &self.facing)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    pub fn new(backend: Arc<dyn MediaBackend>, settings: SessionSettings) -> Self {
        Self {
            backend,
            settings,
            stream: None,
            facing: None,
            recording: None,
            state: SessionState::Unacquired,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The error from the most recent failed acquisition, if any.
    pub fn last_error(&self) -> Option<&DeviceError> {
        self.last_error.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Description of the held stream.
    pub fn handle(&self) -> Option<StreamHandle> {
        let stream = self.stream.as_ref()?;
        Some(StreamHandle {
            id: stream.id(),
            facing: self.facing?,
            resolution: stream.resolution(),
        })
    }

    /// Acquire a camera+microphone stream for `facing`.
    ///
    /// Any held stream is released first so two hardware locks are never
    /// held at once. On failure no stream is held and the error is kept for
    /// display until the next successful acquisition.
    pub async fn acquire(&mut self, facing: Facing) -> Result<StreamHandle, DeviceError> {
        self.release();

        let constraints = StreamConstraints {
            facing,
            ideal: self.settings.ideal,
            audio: self.settings.audio,
        };

        self.state = SessionState::Acquiring;
        log::info!(
            "Requesting {} camera at ideal {}",
            facing,
            constraints.ideal
        );

        match self.backend.acquire(&constraints).await {
            Ok(stream) => {
                let handle = StreamHandle {
                    id: stream.id(),
                    facing,
                    resolution: stream.resolution(),
                };
                self.stream = Some(stream);
                self.facing = Some(facing);
                self.state = SessionState::Active;
                self.last_error = None;
                log::info!(
                    "Stream {} active ({} camera, {})",
                    handle.id,
                    facing,
                    handle.resolution
                );
                Ok(handle)
            }
            Err(e) => {
                log::warn!("Camera access error: {}", e);
                self.state = SessionState::Unacquired;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Apply a zoom factor to the video track, best-effort.
    ///
    /// Returns whether the track accepted it. Missing zoom capability is
    /// expected hardware variance and only logged.
    pub fn apply_zoom(&mut self, factor: f64) -> bool {
        match self.try_apply_zoom(factor) {
            Ok(applied) => {
                log::debug!("Zoom set to {:.1}x", applied);
                true
            }
            Err(SessionError::CapabilityUnsupported(what)) => {
                log::debug!("Zoom ignored: track has no {} capability", what);
                false
            }
            Err(e) => {
                log::warn!("Zoom not supported: {}", e);
                false
            }
        }
    }

    fn try_apply_zoom(&mut self, factor: f64) -> Result<f64, SessionError> {
        let stream = self.stream.as_mut().ok_or(SessionError::NoActiveStream)?;
        let range = stream
            .capabilities()
            .zoom
            .ok_or(SessionError::CapabilityUnsupported("zoom"))?;
        let factor = range.clamp(factor);
        stream.apply_constraint(TrackConstraint::Zoom(factor))?;
        Ok(factor)
    }

    /// Re-assert continuous autofocus, best-effort.
    ///
    /// Returns whether the hardware accepted it.
    pub fn request_focus(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            log::debug!("Focus ignored: no active stream");
            return false;
        };
        if !stream.capabilities().supports_focus(FocusMode::Continuous) {
            log::debug!("Focus ignored: track has no focusMode capability");
            return false;
        }
        match stream.apply_constraint(TrackConstraint::FocusMode(FocusMode::Continuous)) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Focus request failed: {}", e);
                false
            }
        }
    }

    /// Encode the frame visible right now as a JPEG photo.
    pub fn capture_still_frame(&self) -> Result<Artifact, SessionError> {
        let stream = self.stream.as_ref().ok_or(SessionError::NoActiveStream)?;
        let frame = stream.current_frame().ok_or(SessionError::NoFrame)?;
        let data = encode_jpeg(&frame, self.settings.jpeg_quality)?;
        log::info!(
            "Captured {}x{} still ({} bytes)",
            frame.width,
            frame.height,
            data.len()
        );
        Ok(Artifact::new(ArtifactKind::Photo, PHOTO_MIME, data))
    }

    /// Begin recording the active stream.
    ///
    /// Callers must check that no recording is running and a stream is
    /// held; violating either is reported, never acted on.
    pub fn start_clip_recording(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::RecorderUnavailable);
        }
        let stream = self.stream.as_ref().ok_or(SessionError::RecorderUnavailable)?;

        let mut recorder = stream.create_recorder(&self.settings.recorder_mime)?;
        let (tx, rx) = mpsc::unbounded_channel();
        recorder.start(tx)?;

        log::info!("Recording started ({})", recorder.mime());
        self.recording = Some(ActiveRecording {
            recorder,
            events: rx,
        });
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Ask the recorder to stop.
    ///
    /// The returned [`PendingClip`] resolves once the recorder has flushed.
    pub fn stop_clip_recording(&mut self) -> Result<PendingClip, SessionError> {
        let mut recording = self
            .recording
            .take()
            .ok_or(SessionError::RecorderUnavailable)?;

        if recording.recorder.is_active() {
            recording.recorder.stop();
        }
        if self.state == SessionState::Recording {
            self.state = SessionState::Active;
        }
        log::info!("Recording stopped, finalizing clip");

        Ok(PendingClip {
            mime: recording.recorder.mime().to_string(),
            events: recording.events,
        })
    }

    /// Stop every track of the held stream.
    ///
    /// An unfinished recording is abandoned.
    pub fn release(&mut self) {
        if let Some(mut recording) = self.recording.take() {
            log::warn!("Releasing stream while recording; clip discarded");
            recording.recorder.stop();
        }
        if let Some(mut stream) = self.stream.take() {
            log::info!("Releasing stream {}", stream.id());
            stream.stop_all_tracks();
            self.state = SessionState::Released;
        }
        self.facing = None;
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::synthetic::{SyntheticBackend, SyntheticOptions};

    fn session_with(options: SyntheticOptions) -> (DeviceSession, Arc<SyntheticBackend>) {
        let backend = Arc::new(SyntheticBackend::new(options));
        let session = DeviceSession::new(backend.clone(), SessionSettings::default());
        (session, backend)
    }

    #[tokio::test]
    async fn test_acquire_transitions_to_active() {
        let (mut session, _) = session_with(SyntheticOptions::default());
        assert_eq!(session.state(), SessionState::Unacquired);

        let handle = session.acquire(Facing::Rear).await.unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(handle.facing, Facing::Rear);
        assert_eq!(session.handle(), Some(handle));
    }

    #[tokio::test]
    async fn test_reacquire_releases_first() {
        let (mut session, backend) = session_with(SyntheticOptions::default());
        let probe = backend.probe();

        let first = session.acquire(Facing::Rear).await.unwrap();
        let second = session.acquire(Facing::Front).await.unwrap();

        let state = probe.snapshot();
        assert_eq!(state.peak_live, 1);
        assert_eq!(state.live, 1);
        assert_eq!(state.released, vec![first.id]);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_acquire_failure_holds_no_stream() {
        let (mut session, backend) = session_with(SyntheticOptions::default());
        session.acquire(Facing::Rear).await.unwrap();

        backend.set_deny_permission(true);
        let err = session.acquire(Facing::Front).await.unwrap_err();
        assert_eq!(err, DeviceError::PermissionDenied);
        assert_eq!(session.state(), SessionState::Unacquired);
        assert!(!session.has_stream());
        assert_eq!(session.last_error(), Some(&DeviceError::PermissionDenied));
        assert_eq!(backend.probe().snapshot().live, 0);

        backend.set_deny_permission(false);
        session.acquire(Facing::Front).await.unwrap();
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_zoom_clamped_to_track_range() {
        let (mut session, backend) = session_with(SyntheticOptions {
            zoom: Some(crate::session::ZoomRange { min: 1.0, max: 3.0 }),
            ..Default::default()
        });
        session.acquire(Facing::Rear).await.unwrap();

        assert!(session.apply_zoom(4.5));
        assert_eq!(
            backend.probe().snapshot().constraints,
            vec![TrackConstraint::Zoom(3.0)]
        );
    }

    #[tokio::test]
    async fn test_zoom_without_capability_is_noop() {
        let (mut session, backend) = session_with(SyntheticOptions {
            zoom: None,
            ..Default::default()
        });
        session.acquire(Facing::Rear).await.unwrap();

        assert!(!session.apply_zoom(2.0));
        assert!(backend.probe().snapshot().constraints.is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_focus_best_effort() {
        let (mut session, _) = session_with(SyntheticOptions {
            focus: false,
            ..Default::default()
        });
        assert!(!session.request_focus());
        session.acquire(Facing::Rear).await.unwrap();
        assert!(!session.request_focus());

        let (mut session, _) = session_with(SyntheticOptions::default());
        session.acquire(Facing::Rear).await.unwrap();
        assert!(session.request_focus());
    }

    #[tokio::test]
    async fn test_capture_requires_stream() {
        let (mut session, _) = session_with(SyntheticOptions::default());
        assert_eq!(
            session.capture_still_frame().unwrap_err(),
            SessionError::NoActiveStream
        );

        session.acquire(Facing::Rear).await.unwrap();
        let photo = session.capture_still_frame().unwrap();
        assert_eq!(photo.kind, ArtifactKind::Photo);
        assert_eq!(photo.mime, PHOTO_MIME);
        assert!(!photo.data.is_empty());
    }

    #[tokio::test]
    async fn test_recording_round_trip() {
        let (mut session, _) = session_with(SyntheticOptions::default());
        session.acquire(Facing::Rear).await.unwrap();

        session.start_clip_recording().unwrap();
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(
            session.start_clip_recording(),
            Err(SessionError::RecorderUnavailable)
        );

        let pending = session.stop_clip_recording().unwrap();
        assert_eq!(session.state(), SessionState::Active);

        let clip = pending.finish().await.unwrap();
        assert_eq!(clip.kind, ArtifactKind::Video);
        assert_eq!(clip.extension(), "webm");
        assert!(String::from_utf8_lossy(&clip.data).starts_with("SYNTHETIC-CLIP"));
    }

    #[tokio::test]
    async fn test_recording_without_stream_is_rejected() {
        let (mut session, _) = session_with(SyntheticOptions::default());
        assert_eq!(
            session.start_clip_recording(),
            Err(SessionError::RecorderUnavailable)
        );
        assert!(matches!(
            session.stop_clip_recording(),
            Err(SessionError::RecorderUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_release_stops_tracks() {
        let (mut session, backend) = session_with(SyntheticOptions::default());
        session.acquire(Facing::Rear).await.unwrap();
        session.release();

        assert_eq!(session.state(), SessionState::Released);
        assert!(session.handle().is_none());
        assert_eq!(backend.probe().snapshot().live, 0);
    }

    #[tokio::test]
    async fn test_pending_clip_aborted_when_recorder_vanishes() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(RecorderEvent::DataAvailable(vec![1, 2, 3])).unwrap();
        drop(tx);

        let pending = PendingClip {
            mime: "video/webm".to_string(),
            events: rx,
        };
        assert_eq!(pending.finish().await.unwrap_err(), SessionError::RecorderAborted);
    }
}
