//! Capture coordinator: user intents against the device session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::ticker::{RepeatingTask, Tick};
use crate::delivery::ArtifactSink;
use crate::session::{Artifact, DeviceSession, Facing, StreamHandle};
use crate::store::{ArtifactRef, SelfTimer, Store, MIN_ZOOM};

/// Countdown and elapsed-time granularity.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How long the white flash stays up after a photo.
pub const FLASH_DURATION: Duration = Duration::from_millis(100);

/// How long the focus ring stays up after a focus request.
pub const FOCUS_RING_DURATION: Duration = Duration::from_secs(1);

/// Upper bound on waiting for recorders to flush at shutdown.
pub const CLIP_FINALIZE_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything a capture needs, shareable with timer tasks.
#[derive(Clone)]
struct CaptureContext {
    store: Store,
    session: Arc<Mutex<DeviceSession>>,
    sink: Arc<dyn ArtifactSink>,
    shutdown: CancellationToken,
}

impl CaptureContext {
    /// Grab the current frame. Failures are logged, never surfaced.
    async fn capture_photo(&self) -> Option<Artifact> {
        let result = self.session.lock().await.capture_still_frame();
        match result {
            Ok(photo) => Some(photo),
            Err(e) => {
                log::warn!("Photo capture failed: {}", e);
                None
            }
        }
    }

    /// Flash, then deliver the photo and point `last_artifact` at it.
    fn finish_photo(&self, photo: Artifact) {
        self.store.update(|s| s.status.flash_visible = true);
        let store = self.store.clone();
        RepeatingTask::once(FLASH_DURATION, self.shutdown.child_token(), move || {
            store.update(|s| s.status.flash_visible = false);
        })
        .detach();

        self.deliver(photo);
    }

    fn deliver(&self, artifact: Artifact) {
        match self.sink.deliver(&artifact) {
            Ok(locator) => {
                let kind = artifact.kind;
                self.store.update(|s| {
                    s.status.last_artifact = Some(ArtifactRef { kind, locator });
                });
            }
            Err(e) => log::error!("Failed to deliver {}: {}", artifact.kind.name(), e),
        }
    }
}

/// Orchestrates shutter, recording, self-timer and camera switching.
///
/// Enforces that a recording and a self-timer countdown never overlap, and
/// that the camera is not switched while either is running. Every timer it
/// starts hangs off one shutdown token, so [`shutdown`](Self::shutdown) (or
/// dropping the coordinator) stops all of them.
pub struct CaptureCoordinator {
    ctx: CaptureContext,
    countdown: Option<RepeatingTask>,
    elapsed: Option<RepeatingTask>,
    focus_ring: Option<RepeatingTask>,
    pending_clips: Vec<JoinHandle<()>>,
}

impl CaptureCoordinator {
    pub fn new(
        store: Store,
        session: Arc<Mutex<DeviceSession>>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            ctx: CaptureContext {
                store,
                session,
                sink,
                shutdown: CancellationToken::new(),
            },
            countdown: None,
            elapsed: None,
            focus_ring: None,
            pending_clips: Vec::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.ctx.store
    }

    /// True once [`shutdown`](Self::shutdown) has run; intents are ignored.
    pub fn is_shut_down(&self) -> bool {
        self.ctx.shutdown.is_cancelled()
    }

    fn refuse_after_shutdown(&self, intent: &str) -> bool {
        if self.is_shut_down() {
            log::debug!("{} ignored: coordinator shut down", intent);
            return true;
        }
        false
    }

    /// Acquire the camera configured in the store.
    pub async fn start(&mut self) -> Option<StreamHandle> {
        if self.refuse_after_shutdown("Start") {
            return None;
        }
        let facing = self.ctx.store.read(|s| s.config.facing);
        self.acquire(facing).await
    }

    /// User-triggered retry after a camera error.
    pub async fn retry_camera(&mut self) -> Option<StreamHandle> {
        if self.refuse_after_shutdown("Retry") {
            return None;
        }
        if self.ctx.store.read(|s| s.status.is_busy()) {
            log::debug!("Retry ignored: capture in progress");
            return None;
        }
        let facing = self.ctx.store.read(|s| s.config.facing);
        log::info!("Retrying {} camera", facing);
        self.acquire(facing).await
    }

    async fn acquire(&mut self, facing: Facing) -> Option<StreamHandle> {
        let mut session = self.ctx.session.lock().await;
        let result = session.acquire(facing).await;

        let zoom = self.ctx.store.read(|s| s.config.zoom);
        if result.is_ok() && zoom > MIN_ZOOM {
            session.apply_zoom(zoom);
        }
        drop(session);

        match result {
            Ok(handle) => {
                self.ctx.store.update(|s| {
                    s.status.stream = Some(handle);
                    s.status.camera_error = None;
                });
                Some(handle)
            }
            Err(e) => {
                self.ctx.store.update(|s| {
                    s.status.stream = None;
                    s.status.camera_error = Some(e);
                });
                None
            }
        }
    }

    /// Shutter press.
    ///
    /// Ignored while recording or counting down. With the self-timer off the
    /// photo is taken immediately; otherwise a countdown runs and the photo
    /// is taken when it reaches zero.
    pub async fn request_photo_capture(&mut self) {
        if self.refuse_after_shutdown("Shutter") {
            return;
        }
        let (busy, timer) = self
            .ctx
            .store
            .read(|s| (s.status.is_busy(), s.config.self_timer));
        if busy {
            log::debug!("Shutter ignored: capture in progress");
            return;
        }

        if timer == SelfTimer::Off {
            if let Some(photo) = self.ctx.capture_photo().await {
                self.ctx.finish_photo(photo);
            }
            return;
        }

        let mut remaining = timer.seconds();
        log::info!("Self-timer started ({}s)", remaining);
        self.ctx
            .store
            .update(|s| s.status.countdown_remaining = Some(remaining));

        let ctx = self.ctx.clone();
        self.countdown = Some(RepeatingTask::spawn(
            TICK_PERIOD,
            self.ctx.shutdown.child_token(),
            move |_| {
                remaining = remaining.saturating_sub(1);
                let left = remaining;
                let ctx = ctx.clone();
                async move {
                    if left > 0 {
                        ctx.store
                            .update(|s| s.status.countdown_remaining = Some(left));
                        return Tick::Continue;
                    }
                    let photo = ctx.capture_photo().await;
                    ctx.store.update(|s| s.status.countdown_remaining = None);
                    if let Some(photo) = photo {
                        ctx.finish_photo(photo);
                    }
                    Tick::Finish
                }
            },
        ));
    }

    /// Abort a running self-timer without taking a photo.
    pub fn cancel_countdown(&mut self) -> bool {
        let Some(countdown) = self.countdown.take() else {
            return false;
        };
        countdown.cancel();
        let was_running = self
            .ctx
            .store
            .read(|s| s.status.countdown_remaining.is_some());
        if was_running {
            log::info!("Self-timer cancelled");
            self.ctx
                .store
                .update(|s| s.status.countdown_remaining = None);
        }
        was_running
    }

    /// Record button. Ignored during a countdown.
    pub async fn toggle_recording(&mut self) {
        if self.refuse_after_shutdown("Record") {
            return;
        }
        let (recording, counting) = self.ctx.store.read(|s| {
            (
                s.status.is_recording,
                s.status.countdown_remaining.is_some(),
            )
        });
        if counting {
            log::debug!("Record ignored: self-timer running");
            return;
        }

        if recording {
            self.stop_recording().await;
        } else {
            self.start_recording().await;
        }
    }

    async fn start_recording(&mut self) {
        let started = self.ctx.session.lock().await.start_clip_recording();
        if let Err(e) = started {
            log::warn!("Cannot start recording: {}", e);
            return;
        }

        self.ctx.store.update(|s| {
            s.status.is_recording = true;
            s.status.recording_elapsed_secs = 0;
        });

        let store = self.ctx.store.clone();
        self.elapsed = Some(RepeatingTask::spawn(
            TICK_PERIOD,
            self.ctx.shutdown.child_token(),
            move |_| {
                store.update(|s| s.status.recording_elapsed_secs += 1);
                async { Tick::Continue }
            },
        ));
    }

    async fn stop_recording(&mut self) {
        if let Some(elapsed) = self.elapsed.take() {
            elapsed.cancel();
        }

        let pending = self.ctx.session.lock().await.stop_clip_recording();
        self.ctx.store.update(|s| s.status.is_recording = false);

        let pending = match pending {
            Ok(pending) => pending,
            Err(e) => {
                log::warn!("Cannot stop recording: {}", e);
                return;
            }
        };

        // The clip only exists once the recorder flushes.
        let ctx = self.ctx.clone();
        self.pending_clips.retain(|h| !h.is_finished());
        self.pending_clips.push(tokio::spawn(async move {
            match pending.finish().await {
                Ok(clip) => ctx.deliver(clip),
                Err(e) => log::warn!("Clip finalization failed: {}", e),
            }
        }));
    }

    /// Toggle front/rear camera. Ignored while recording or counting down.
    ///
    /// Zoom goes back to 1.0 because the new camera has its own calibration.
    pub async fn switch_facing(&mut self) -> Option<StreamHandle> {
        if self.refuse_after_shutdown("Camera switch") {
            return None;
        }
        if self.ctx.store.read(|s| s.status.is_busy()) {
            log::debug!("Camera switch ignored: capture in progress");
            return None;
        }

        let mut facing = Facing::default();
        self.ctx.store.update(|s| {
            s.config.facing = s.config.facing.toggled();
            s.config.zoom = MIN_ZOOM;
            facing = s.config.facing;
        });
        log::info!("Switching to {} camera", facing);
        self.acquire(facing).await
    }

    /// One clockwise step of the composition guide. Always permitted.
    pub fn rotate_overlay_orientation(&self) {
        let orientation = self.ctx.store.rotate_orientation();
        log::debug!("Overlay orientation: {}", orientation);
    }

    /// Store a zoom factor and apply it to the camera, best-effort.
    pub async fn set_zoom(&mut self, factor: f64) -> f64 {
        let zoom = self.ctx.store.set_zoom(factor);
        self.ctx.session.lock().await.apply_zoom(zoom);
        zoom
    }

    /// Show the focus ring and ask the camera to refocus.
    ///
    /// The ring appears whether or not the hardware can refocus.
    pub async fn request_focus(&mut self) {
        if self.refuse_after_shutdown("Focus") {
            return;
        }
        self.ctx.store.update(|s| s.status.focus_ring_visible = true);
        let store = self.ctx.store.clone();
        self.focus_ring = Some(RepeatingTask::once(
            FOCUS_RING_DURATION,
            self.ctx.shutdown.child_token(),
            move || store.update(|s| s.status.focus_ring_visible = false),
        ));

        self.ctx.session.lock().await.request_focus();
    }

    pub fn toggle_spiral(&self) {
        self.ctx.store.toggle_spiral();
    }

    pub fn toggle_grid(&self) {
        self.ctx.store.toggle_grid();
    }

    pub fn set_self_timer(&self, timer: SelfTimer) {
        self.ctx.store.set_self_timer(timer);
    }

    pub fn cycle_self_timer(&self) -> SelfTimer {
        self.ctx.store.cycle_self_timer()
    }

    /// Tear down: stop timers, finish an in-progress recording, release the
    /// camera.
    ///
    /// Clips already stopped get [`CLIP_FINALIZE_TIMEOUT`] to flush so each
    /// record action still delivers its video; anything slower is dropped.
    pub async fn shutdown(&mut self) {
        log::info!("Shutting down capture coordinator");
        self.ctx.shutdown.cancel();
        self.cancel_countdown();
        self.elapsed.take();
        self.focus_ring.take();

        if self.ctx.store.read(|s| s.status.is_recording) {
            self.stop_recording().await;
        }

        let clips = std::mem::take(&mut self.pending_clips);
        let aborts: Vec<_> = clips.iter().map(|h| h.abort_handle()).collect();
        let flushed = tokio::time::timeout(CLIP_FINALIZE_TIMEOUT, async {
            for clip in clips {
                let _ = clip.await;
            }
        })
        .await;
        if flushed.is_err() {
            log::warn!("Clip finalization timed out; discarding unfinished clips");
            for abort in aborts {
                abort.abort();
            }
        }

        self.ctx.session.lock().await.release();
        self.ctx.store.update(|s| {
            s.status.stream = None;
            s.status.flash_visible = false;
            s.status.focus_ring_visible = false;
        });
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        self.ctx.shutdown.cancel();
        for clip in &self.pending_clips {
            clip.abort();
        }
    }
}
