//! Synthetic test-pattern camera.
//!
//! Implements the media boundary without hardware: streams render a moving
//! colour-bar pattern, recorders emit a small tagged chunk on stop. A
//! [`Probe`] records every acquisition, release and applied constraint so
//! callers can check stream exclusivity from the outside.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::backend::{MediaBackend, MediaRecorder, MediaStream, RecorderEvent};
use super::types::{
    DeviceError, Facing, FocusMode, Frame, Resolution, SessionError, StreamConstraints,
    TrackCapabilities, TrackConstraint, ZoomRange,
};

/// Configuration of the synthetic camera.
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Reject every acquisition with `PermissionDenied`
    pub deny_permission: bool,
    /// Facing modes that report `NotAvailable`
    pub unavailable: Vec<Facing>,
    /// Advertised zoom range (`None` = no zoom capability)
    pub zoom: Option<ZoomRange>,
    /// Advertise continuous autofocus
    pub focus: bool,
    /// Largest resolution the sensor can deliver
    pub native: Resolution,
    /// Simulated permission-prompt latency
    pub acquire_delay: Duration,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            deny_permission: false,
            unavailable: Vec::new(),
            zoom: Some(ZoomRange { min: 1.0, max: 5.0 }),
            focus: true,
            native: Resolution {
                width: 640,
                height: 360,
            },
            acquire_delay: Duration::ZERO,
        }
    }
}

/// Observations made by the synthetic backend.
#[derive(Debug, Clone, Default)]
pub struct ProbeState {
    /// Streams currently holding tracks
    pub live: usize,
    /// Highest value `live` ever reached
    pub peak_live: usize,
    /// Every successful acquisition, in order
    pub acquired: Vec<(u64, Facing)>,
    /// Every released stream id, in order
    pub released: Vec<u64>,
    /// Every constraint a track accepted
    pub constraints: Vec<TrackConstraint>,
    /// Number of recordings started
    pub recordings_started: usize,
    /// Number of acquisition attempts (including failures)
    pub attempts: usize,
}

/// Shared view of [`ProbeState`].
#[derive(Debug, Clone, Default)]
pub struct Probe(Arc<Mutex<ProbeState>>);

impl Probe {
    /// Copy of the current observations.
    pub fn snapshot(&self) -> ProbeState {
        self.0.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut ProbeState) -> R) -> Option<R> {
        self.0.lock().ok().map(|mut s| f(&mut s))
    }
}

/// Test-pattern [`MediaBackend`].
pub struct SyntheticBackend {
    options: SyntheticOptions,
    deny_permission: AtomicBool,
    next_id: AtomicU64,
    probe: Probe,
}

impl SyntheticBackend {
    pub fn new(options: SyntheticOptions) -> Self {
        Self {
            deny_permission: AtomicBool::new(options.deny_permission),
            options,
            next_id: AtomicU64::new(1),
            probe: Probe::default(),
        }
    }

    /// Flip the permission answer, e.g. after the user fixes site settings.
    pub fn set_deny_permission(&self, deny: bool) {
        self.deny_permission.store(deny, Ordering::SeqCst);
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(SyntheticOptions::default())
    }
}

#[async_trait]
impl MediaBackend for SyntheticBackend {
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError> {
        self.probe.with(|p| p.attempts += 1);

        if !self.options.acquire_delay.is_zero() {
            tokio::time::sleep(self.options.acquire_delay).await;
        }

        if self.deny_permission.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied);
        }
        if self.options.unavailable.contains(&constraints.facing) {
            return Err(DeviceError::NotAvailable(format!(
                "no {} camera",
                constraints.facing
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let native = self.options.native;
        let resolution = Resolution {
            width: constraints.ideal.width.min(native.width),
            height: constraints.ideal.height.min(native.height),
        };

        self.probe.with(|p| {
            p.live += 1;
            p.peak_live = p.peak_live.max(p.live);
            p.acquired.push((id, constraints.facing));
        });

        let mut focus_modes = Vec::new();
        if self.options.focus {
            focus_modes.push(FocusMode::Continuous);
            focus_modes.push(FocusMode::SingleShot);
        }

        Ok(Box::new(SyntheticStream {
            id,
            resolution,
            capabilities: TrackCapabilities {
                zoom: self.options.zoom,
                focus_modes,
            },
            frames: AtomicU64::new(0),
            stopped: false,
            probe: self.probe.clone(),
        }))
    }
}

struct SyntheticStream {
    id: u64,
    resolution: Resolution,
    capabilities: TrackCapabilities,
    frames: AtomicU64,
    stopped: bool,
    probe: Probe,
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> u64 {
        self.id
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn capabilities(&self) -> TrackCapabilities {
        self.capabilities.clone()
    }

    fn apply_constraint(&mut self, constraint: TrackConstraint) -> Result<(), SessionError> {
        if self.stopped {
            return Err(SessionError::NoActiveStream);
        }
        match constraint {
            TrackConstraint::Zoom(_) if self.capabilities.zoom.is_none() => {
                return Err(SessionError::CapabilityUnsupported("zoom"));
            }
            TrackConstraint::FocusMode(mode) if !self.capabilities.supports_focus(mode) => {
                return Err(SessionError::CapabilityUnsupported("focusMode"));
            }
            _ => {}
        }
        self.probe.with(|p| p.constraints.push(constraint));
        Ok(())
    }

    fn current_frame(&self) -> Option<Frame> {
        if self.stopped {
            return None;
        }
        let n = self.frames.fetch_add(1, Ordering::Relaxed);
        Some(colour_bars(self.resolution, n))
    }

    fn create_recorder(&self, mime: &str) -> Result<Box<dyn MediaRecorder>, SessionError> {
        if self.stopped {
            return Err(SessionError::RecorderUnavailable);
        }
        Ok(Box::new(SyntheticRecorder {
            stream_id: self.id,
            mime: mime.to_string(),
            events: None,
            probe: self.probe.clone(),
        }))
    }

    fn stop_all_tracks(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let id = self.id;
        self.probe.with(|p| {
            p.live = p.live.saturating_sub(1);
            p.released.push(id);
        });
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

struct SyntheticRecorder {
    stream_id: u64,
    mime: String,
    events: Option<UnboundedSender<RecorderEvent>>,
    probe: Probe,
}

impl MediaRecorder for SyntheticRecorder {
    fn start(&mut self, events: UnboundedSender<RecorderEvent>) -> Result<(), SessionError> {
        if self.events.is_some() {
            return Err(SessionError::Platform("recorder already started".to_string()));
        }
        self.events = Some(events);
        self.probe.with(|p| p.recordings_started += 1);
        Ok(())
    }

    fn stop(&mut self) {
        // Mirrors the platform recorder: final chunk, then the stop event.
        if let Some(events) = self.events.take() {
            let chunk = format!("SYNTHETIC-CLIP stream={} mime={}", self.stream_id, self.mime);
            let _ = events.send(RecorderEvent::DataAvailable(chunk.into_bytes()));
            let _ = events.send(RecorderEvent::DataAvailable(Vec::new()));
            let _ = events.send(RecorderEvent::Stopped);
        }
    }

    fn is_active(&self) -> bool {
        self.events.is_some()
    }

    fn mime(&self) -> &str {
        &self.mime
    }
}

/// Eight vertical colour bars scrolling one column per frame.
fn colour_bars(resolution: Resolution, frame_number: u64) -> Frame {
    const BARS: [[u8; 3]; 8] = [
        [235, 235, 235],
        [235, 235, 16],
        [16, 235, 235],
        [16, 235, 16],
        [235, 16, 235],
        [235, 16, 16],
        [16, 16, 235],
        [16, 16, 16],
    ];

    let width = resolution.width.max(1) as usize;
    let height = resolution.height as usize;
    let bar_width = (width / BARS.len()).max(1);
    let offset = frame_number as usize % width;

    let mut row = Vec::with_capacity(width * 3);
    for x in 0..width {
        let bar = ((x + offset) % width / bar_width).min(BARS.len() - 1);
        row.extend_from_slice(&BARS[bar]);
    }

    let mut data = Vec::with_capacity(row.len() * height);
    for _ in 0..height {
        data.extend_from_slice(&row);
    }

    Frame {
        data,
        width: width as u32,
        height: height as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn constraints(facing: Facing) -> StreamConstraints {
        StreamConstraints {
            facing,
            ideal: Resolution::FULL_HD,
            audio: true,
        }
    }

    #[tokio::test]
    async fn test_acquire_negotiates_down_to_native() {
        let backend = SyntheticBackend::default();
        let stream = backend.acquire(&constraints(Facing::Rear)).await.unwrap();
        assert_eq!(stream.resolution(), SyntheticOptions::default().native);

        let frame = stream.current_frame().unwrap();
        assert!(frame.is_well_formed());
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 360);
    }

    #[tokio::test]
    async fn test_denied_permission() {
        let backend = SyntheticBackend::new(SyntheticOptions {
            deny_permission: true,
            ..Default::default()
        });
        let result = backend.acquire(&constraints(Facing::Rear)).await;
        assert!(matches!(result, Err(DeviceError::PermissionDenied)));
        assert_eq!(backend.probe().snapshot().live, 0);

        backend.set_deny_permission(false);
        assert!(backend.acquire(&constraints(Facing::Rear)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unavailable_facing() {
        let backend = SyntheticBackend::new(SyntheticOptions {
            unavailable: vec![Facing::Front],
            ..Default::default()
        });
        let result = backend.acquire(&constraints(Facing::Front)).await;
        assert!(matches!(result, Err(DeviceError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn test_stop_and_drop_release_once() {
        let backend = SyntheticBackend::default();
        let probe = backend.probe();

        let mut stream = backend.acquire(&constraints(Facing::Rear)).await.unwrap();
        assert_eq!(probe.snapshot().live, 1);

        stream.stop_all_tracks();
        assert!(stream.current_frame().is_none());
        drop(stream);

        let state = probe.snapshot();
        assert_eq!(state.live, 0);
        assert_eq!(state.released.len(), 1);
    }

    #[tokio::test]
    async fn test_zoom_unsupported() {
        let backend = SyntheticBackend::new(SyntheticOptions {
            zoom: None,
            ..Default::default()
        });
        let mut stream = backend.acquire(&constraints(Facing::Rear)).await.unwrap();
        assert_eq!(
            stream.apply_constraint(TrackConstraint::Zoom(2.0)),
            Err(SessionError::CapabilityUnsupported("zoom"))
        );
    }

    #[tokio::test]
    async fn test_recorder_emits_chunks_then_stop() {
        let backend = SyntheticBackend::default();
        let stream = backend.acquire(&constraints(Facing::Rear)).await.unwrap();
        let mut recorder = stream.create_recorder("video/webm").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        recorder.start(tx).unwrap();
        assert!(recorder.is_active());

        recorder.stop();
        assert!(!recorder.is_active());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.last(), Some(&RecorderEvent::Stopped));
        assert!(matches!(events[0], RecorderEvent::DataAvailable(ref d) if !d.is_empty()));
    }

    #[test]
    fn test_colour_bars_scroll() {
        let res = Resolution {
            width: 16,
            height: 2,
        };
        let a = colour_bars(res, 0);
        let b = colour_bars(res, 1);
        assert!(a.is_well_formed());
        assert_ne!(a.data, b.data);
    }
}
