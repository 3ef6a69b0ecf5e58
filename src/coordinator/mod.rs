//! Capture coordination: shutter, self-timer, recording and camera switching.

mod capture;
mod ticker;

pub use capture::{
    CaptureCoordinator, CLIP_FINALIZE_TIMEOUT, FLASH_DURATION, FOCUS_RING_DURATION, TICK_PERIOD,
};
pub use ticker::{RepeatingTask, Tick};
