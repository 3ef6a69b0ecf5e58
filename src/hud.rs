//! Heads-up display text for the viewfinder.

use crate::store::AppState;

/// Format seconds as `MM:SS`.
///
/// Minutes keep growing past 99 rather than wrapping.
pub fn format_duration(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Status line shown above the controls.
///
/// Shows: REC/STANDBY | facing • zoom | orientation | timer | flags
#[derive(Debug, Clone)]
pub struct StatusLine {
    /// Whether the status line is visible
    pub visible: bool,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLine {
    /// Create a new status line with default settings (visible).
    pub fn new() -> Self {
        Self { visible: true }
    }

    pub fn with_visibility(visible: bool) -> Self {
        Self { visible }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Format the status text for the given state.
    pub fn format(&self, state: &AppState) -> String {
        let config = &state.config;
        let status = &state.status;

        let mode = if status.is_recording {
            format!("REC {}", format_duration(status.recording_elapsed_secs))
        } else if let Some(remaining) = status.countdown_remaining {
            format!("TIMER {}", remaining)
        } else {
            "STANDBY".to_string()
        };

        let mut guides = Vec::new();
        if config.overlay.spiral {
            guides.push("spiral");
        }
        if config.overlay.grid {
            guides.push("grid");
        }
        let guides = if guides.is_empty() {
            "none".to_string()
        } else {
            guides.join("+")
        };

        let mut line = format!(
            " {} | {} \u{2022} {:.1}x | {} {} | timer {} ",
            mode,
            config.facing,
            config.zoom,
            guides,
            config.orientation,
            config.self_timer,
        );

        if status.camera_error.is_some() {
            line.push_str("| CAMERA UNAVAILABLE (retry) ");
        }
        if state.shell.offline {
            line.push_str("| OFFLINE ");
        }
        if state.shell.install_available {
            line.push_str("| install available ");
        }
        line
    }
}
