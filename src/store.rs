//! Application state store.
//!
//! One in-process read model for the viewfinder: user configuration,
//! runtime status and shell signals. Readers take snapshots or subscribe to
//! change notifications; writers apply a closure that mutates the state and
//! every subscriber is woken once per mutation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::overlay::Orientation;
use crate::session::{ArtifactKind, DeviceError, Facing, StreamHandle};

/// Smallest zoom factor.
pub const MIN_ZOOM: f64 = 1.0;

/// Largest zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Self-timer delay before a photo is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SelfTimer {
    /// Capture immediately
    #[default]
    Off,
    Three,
    Five,
    Ten,
}

impl SelfTimer {
    pub fn seconds(&self) -> u32 {
        match self {
            SelfTimer::Off => 0,
            SelfTimer::Three => 3,
            SelfTimer::Five => 5,
            SelfTimer::Ten => 10,
        }
    }

    /// Cycle to the next setting.
    ///
    /// Order: Off -> 3s -> 5s -> 10s -> Off
    pub fn next(&self) -> Self {
        match self {
            SelfTimer::Off => SelfTimer::Three,
            SelfTimer::Three => SelfTimer::Five,
            SelfTimer::Five => SelfTimer::Ten,
            SelfTimer::Ten => SelfTimer::Off,
        }
    }
}

impl TryFrom<u32> for SelfTimer {
    type Error = String;

    fn try_from(seconds: u32) -> Result<Self, Self::Error> {
        match seconds {
            0 => Ok(SelfTimer::Off),
            3 => Ok(SelfTimer::Three),
            5 => Ok(SelfTimer::Five),
            10 => Ok(SelfTimer::Ten),
            other => Err(format!(
                "Self-timer must be 0, 3, 5 or 10 seconds, got {}",
                other
            )),
        }
    }
}

impl From<SelfTimer> for u32 {
    fn from(timer: SelfTimer) -> Self {
        timer.seconds()
    }
}

impl fmt::Display for SelfTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfTimer::Off => f.write_str("off"),
            other => write!(f, "{}s", other.seconds()),
        }
    }
}

/// Which composition guides are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayVisibility {
    pub spiral: bool,
    pub grid: bool,
}

impl Default for OverlayVisibility {
    fn default() -> Self {
        Self {
            spiral: true,
            grid: false,
        }
    }
}

/// User-controlled session configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub facing: Facing,
    /// Zoom factor in [`MIN_ZOOM`, `MAX_ZOOM`]
    pub zoom: f64,
    pub overlay: OverlayVisibility,
    pub orientation: Orientation,
    pub self_timer: SelfTimer,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            facing: Facing::default(),
            zoom: MIN_ZOOM,
            overlay: OverlayVisibility::default(),
            orientation: Orientation::default(),
            self_timer: SelfTimer::default(),
        }
    }
}

/// Pointer to the most recently delivered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    /// Where the delivery sink put it
    pub locator: String,
}

/// Runtime status, never set directly by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStatus {
    pub is_recording: bool,
    pub recording_elapsed_secs: u32,
    /// Present only while a self-timer countdown runs
    pub countdown_remaining: Option<u32>,
    pub last_artifact: Option<ArtifactRef>,
    /// Full-screen flash after a photo
    pub flash_visible: bool,
    /// Focus ring after a focus request
    pub focus_ring_visible: bool,
    /// Why the camera is unavailable; shown with a retry affordance
    pub camera_error: Option<DeviceError>,
    pub stream: Option<StreamHandle>,
}

impl SessionStatus {
    /// Whether a capture is in progress (recording or counting down).
    pub fn is_busy(&self) -> bool {
        self.is_recording || self.countdown_remaining.is_some()
    }
}

/// Connectivity and installability hints from the hosting shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShellSignals {
    pub offline: bool,
    pub install_available: bool,
}

/// Everything the viewfinder renders from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub config: SessionConfig,
    pub status: SessionStatus,
    pub shell: ShellSignals,
}

/// Observer-notified handle to the application state.
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.tx.borrow())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Store {
    /// Create a store with the given initial configuration.
    pub fn new(config: SessionConfig) -> Self {
        let state = AppState {
            config: SessionConfig {
                zoom: clamp_zoom(config.zoom),
                ..config
            },
            ..AppState::default()
        };
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Read part of the state without cloning all of it.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Receiver that is notified after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Apply a mutation and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut AppState)) {
        self.tx.send_modify(f);
    }

    pub fn toggle_spiral(&self) {
        self.update(|s| s.config.overlay.spiral = !s.config.overlay.spiral);
    }

    pub fn toggle_grid(&self) {
        self.update(|s| s.config.overlay.grid = !s.config.overlay.grid);
    }

    pub fn set_self_timer(&self, timer: SelfTimer) {
        self.update(|s| s.config.self_timer = timer);
    }

    /// Advance the self-timer one step and return the new setting.
    pub fn cycle_self_timer(&self) -> SelfTimer {
        let mut next = SelfTimer::Off;
        self.update(|s| {
            s.config.self_timer = s.config.self_timer.next();
            next = s.config.self_timer;
        });
        next
    }

    /// Advance the overlay orientation one clockwise step.
    pub fn rotate_orientation(&self) -> Orientation {
        let mut next = Orientation::TopLeft;
        self.update(|s| {
            s.config.orientation = s.config.orientation.next();
            next = s.config.orientation;
        });
        next
    }

    /// Store a zoom factor, clamped to the supported range.
    pub fn set_zoom(&self, factor: f64) -> f64 {
        let zoom = clamp_zoom(factor);
        self.update(|s| s.config.zoom = zoom);
        zoom
    }

    pub fn set_offline(&self, offline: bool) {
        self.update(|s| s.shell.offline = offline);
    }

    pub fn set_install_available(&self, available: bool) {
        self.update(|s| s.shell.install_available = available);
    }
}

/// Clamp a zoom factor into [`MIN_ZOOM`, `MAX_ZOOM`]; NaN becomes `MIN_ZOOM`.
pub fn clamp_zoom(factor: f64) -> f64 {
    if factor.is_nan() {
        return MIN_ZOOM;
    }
    factor.clamp(MIN_ZOOM, MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = Store::default().get();
        assert_eq!(state.config.facing, Facing::Rear);
        assert_eq!(state.config.zoom, 1.0);
        assert!(state.config.overlay.spiral);
        assert!(!state.config.overlay.grid);
        assert_eq!(state.config.orientation, Orientation::TopLeft);
        assert_eq!(state.config.self_timer, SelfTimer::Off);
        assert!(!state.status.is_busy());
        assert!(state.status.last_artifact.is_none());
    }

    #[test]
    fn test_self_timer_cycle() {
        let store = Store::default();
        assert_eq!(store.cycle_self_timer(), SelfTimer::Three);
        assert_eq!(store.cycle_self_timer(), SelfTimer::Five);
        assert_eq!(store.cycle_self_timer(), SelfTimer::Ten);
        assert_eq!(store.cycle_self_timer(), SelfTimer::Off);
    }

    #[test]
    fn test_self_timer_from_seconds() {
        assert_eq!(SelfTimer::try_from(5), Ok(SelfTimer::Five));
        assert!(SelfTimer::try_from(4).is_err());
        assert_eq!(u32::from(SelfTimer::Ten), 10);
        assert_eq!(SelfTimer::Three.to_string(), "3s");
        assert_eq!(SelfTimer::Off.to_string(), "off");
    }

    #[test]
    fn test_zoom_is_clamped() {
        let store = Store::default();
        assert_eq!(store.set_zoom(7.5), MAX_ZOOM);
        assert_eq!(store.set_zoom(0.2), MIN_ZOOM);
        assert_eq!(store.set_zoom(2.5), 2.5);
        assert_eq!(store.set_zoom(f64::NAN), MIN_ZOOM);
    }

    #[test]
    fn test_initial_zoom_is_clamped() {
        let store = Store::new(SessionConfig {
            zoom: 9.0,
            ..SessionConfig::default()
        });
        assert_eq!(store.get().config.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_toggles() {
        let store = Store::default();
        store.toggle_spiral();
        store.toggle_grid();
        let overlay = store.get().config.overlay;
        assert!(!overlay.spiral);
        assert!(overlay.grid);
    }

    #[test]
    fn test_rotate_orientation() {
        let store = Store::default();
        assert_eq!(store.rotate_orientation(), Orientation::TopRight);
        store.rotate_orientation();
        store.rotate_orientation();
        assert_eq!(store.rotate_orientation(), Orientation::TopLeft);
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let store = Store::default();
        let mut rx = store.subscribe();

        store.set_offline(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().shell.offline);

        let clone = store.clone();
        clone.set_install_available(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow().shell.install_available);
    }

    #[test]
    fn test_state_serializes() {
        let json = serde_json::to_value(Store::default().get()).unwrap();
        assert_eq!(json["config"]["facing"], "rear");
        assert_eq!(json["config"]["orientation"], "top-left");
        assert_eq!(json["config"]["self_timer"], 0);
    }
}
