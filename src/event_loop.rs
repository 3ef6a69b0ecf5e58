//! Async event loop for the line-driven viewfinder.
//!
//! This module separates the main event loop logic from initialization,
//! making the code more testable and maintainable.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::coordinator::CaptureCoordinator;
use crate::hud::StatusLine;
use crate::input::{parse_line, Action, LineAction, HELP_TEXT};
use crate::overlay::{grid_lines, spiral_svg, Axis};
use crate::store::{AppState, ArtifactRef, SessionConfig};

/// Whether the loop keeps going after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Apply one command to the coordinator.
pub async fn dispatch(coordinator: &mut CaptureCoordinator, action: Action) -> Flow {
    match action {
        Action::Shoot => coordinator.request_photo_capture().await,
        Action::Record => coordinator.toggle_recording().await,
        Action::Switch => {
            coordinator.switch_facing().await;
        }
        Action::Rotate => coordinator.rotate_overlay_orientation(),
        Action::ToggleGrid => coordinator.toggle_grid(),
        Action::ToggleSpiral => coordinator.toggle_spiral(),
        Action::Timer(Some(timer)) => coordinator.set_self_timer(timer),
        Action::Timer(None) => {
            coordinator.cycle_self_timer();
        }
        Action::Cancel => {
            if !coordinator.cancel_countdown() {
                println!("No self-timer running.");
            }
        }
        Action::Zoom(factor) => {
            coordinator.set_zoom(factor).await;
        }
        Action::Focus => coordinator.request_focus().await,
        Action::Retry => {
            coordinator.retry_camera().await;
        }
        Action::Status => match serde_json::to_string_pretty(&coordinator.store().get()) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to render state: {}", e),
        },
        Action::Overlay => println!("{}", render_overlays(&coordinator.store().get().config)),
        Action::Offline => coordinator.store().set_offline(true),
        Action::Online => coordinator.store().set_offline(false),
        Action::Installable => coordinator.store().set_install_available(true),
        Action::Install => {
            if coordinator.store().read(|s| s.shell.install_available) {
                log::info!("Install offer accepted");
                coordinator.store().set_install_available(false);
            } else {
                println!("No install offer pending.");
            }
        }
        Action::Help => println!("{}", HELP_TEXT),
        Action::Quit => return Flow::Quit,
    }
    Flow::Continue
}

/// Text form of the guides currently switched on.
fn render_overlays(config: &SessionConfig) -> String {
    let mut out = String::new();
    let lines = grid_lines(config.overlay.grid);
    for line in &lines {
        let axis = match line.axis {
            Axis::Vertical => "x",
            Axis::Horizontal => "y",
        };
        out.push_str(&format!("grid {}={:.3}\n", axis, line.position));
    }
    if let Some(svg) = spiral_svg(config.orientation, config.overlay.spiral) {
        out.push_str(&svg);
    }
    if out.is_empty() {
        out.push_str("No guides visible.");
    }
    out.trim_end().to_string()
}

/// Async main event loop using tokio::select! for concurrent handling.
///
/// This loop handles three concurrent concerns:
/// 1. Command lines from `input`
/// 2. Store changes, echoed as a status line and artifact notices
/// 3. Interrupts (Ctrl+C) from `interrupts`
///
/// The loop exits on `quit`, end of input or an interrupt, then shuts the
/// coordinator down so pending clips are delivered and the camera released.
pub async fn run<R>(
    coordinator: &mut CaptureCoordinator,
    input: R,
    mut interrupts: mpsc::UnboundedReceiver<()>,
    status_line: &StatusLine,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut updates = coordinator.store().subscribe();
    let mut echo = Echo::new(&updates.borrow_and_update());

    if status_line.visible {
        println!("{}", status_line.format(&coordinator.store().get()));
    }

    let result: Result<(), Box<dyn std::error::Error + Send + Sync>> = loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => match parse_line(&line) {
                        LineAction::Run(action) => {
                            if dispatch(coordinator, action).await == Flow::Quit {
                                break Ok(());
                            }
                        }
                        LineAction::Invalid(message) => println!("{}", message),
                        LineAction::None => {}
                    },
                    // End of input
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e.into()),
                }
            }

            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = updates.borrow_and_update().clone();
                echo.show(&state, status_line);
            }

            Some(()) = interrupts.recv() => {
                log::info!("Interrupted");
                break Ok(());
            }
        }
    };

    coordinator.shutdown().await;

    // Clips finalized during shutdown still get announced.
    let state = coordinator.store().get();
    echo.show(&state, status_line);

    result
}

/// Prints what changed since the last echo.
struct Echo {
    last_line: String,
    last_artifact: Option<ArtifactRef>,
}

impl Echo {
    fn new(state: &AppState) -> Self {
        Self {
            last_line: String::new(),
            last_artifact: state.status.last_artifact.clone(),
        }
    }

    fn show(&mut self, state: &AppState, status_line: &StatusLine) {
        if state.status.last_artifact != self.last_artifact {
            if let Some(artifact) = &state.status.last_artifact {
                println!("Saved {}: {}", artifact.kind.name(), artifact.locator);
            }
            self.last_artifact = state.status.last_artifact.clone();
        }

        if status_line.visible {
            let line = status_line.format(state);
            if line != self.last_line {
                println!("{}", line);
                self.last_line = line;
            }
        }
    }
}

/// Set up the Ctrl+C handler; each interrupt is sent on the returned channel.
pub fn setup_ctrlc_handler() -> Result<mpsc::UnboundedReceiver<()>, ctrlc::Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, shutting down...");
        let _ = tx.send(());
    })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{ArtifactSink, DeliveryError};
    use crate::session::{Artifact, ArtifactKind, DeviceSession, SessionSettings, SyntheticBackend};
    use crate::store::{SessionConfig, Store};
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::io::BufReader;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        delivered: StdMutex<Vec<ArtifactKind>>,
    }

    impl ArtifactSink for MemorySink {
        fn deliver(&self, artifact: &Artifact) -> Result<String, DeliveryError> {
            let mut delivered = self.delivered.lock().unwrap();
            delivered.push(artifact.kind);
            Ok(format!("memory://{}", delivered.len()))
        }
    }

    fn coordinator(sink: Arc<MemorySink>) -> CaptureCoordinator {
        let backend = Arc::new(SyntheticBackend::default());
        let session = DeviceSession::new(backend, SessionSettings::default());
        CaptureCoordinator::new(
            Store::new(SessionConfig::default()),
            Arc::new(Mutex::new(session)),
            sink,
        )
    }

    #[tokio::test]
    async fn test_dispatch_quit() {
        let mut coordinator = coordinator(Arc::new(MemorySink::default()));
        assert_eq!(dispatch(&mut coordinator, Action::Quit).await, Flow::Quit);
        assert_eq!(dispatch(&mut coordinator, Action::Rotate).await, Flow::Continue);
    }

    #[tokio::test]
    async fn test_dispatch_store_toggles() {
        let mut coordinator = coordinator(Arc::new(MemorySink::default()));
        dispatch(&mut coordinator, Action::ToggleGrid).await;
        dispatch(&mut coordinator, Action::Timer(None)).await;
        dispatch(&mut coordinator, Action::Offline).await;

        let state = coordinator.store().get();
        assert!(state.config.overlay.grid);
        assert_eq!(state.config.self_timer.seconds(), 3);
        assert!(state.shell.offline);
    }

    #[tokio::test]
    async fn test_dispatch_install_offer() {
        let mut coordinator = coordinator(Arc::new(MemorySink::default()));
        dispatch(&mut coordinator, Action::Installable).await;
        assert!(coordinator.store().get().shell.install_available);

        dispatch(&mut coordinator, Action::Install).await;
        assert!(!coordinator.store().get().shell.install_available);

        // Nothing pending: stays off.
        dispatch(&mut coordinator, Action::Install).await;
        assert!(!coordinator.store().get().shell.install_available);
    }

    #[test]
    fn test_render_overlays() {
        let mut config = SessionConfig::default();
        config.overlay.spiral = false;
        config.overlay.grid = false;
        assert_eq!(render_overlays(&config), "No guides visible.");

        config.overlay.grid = true;
        let text = render_overlays(&config);
        assert_eq!(text.lines().filter(|l| l.starts_with("grid x=")).count(), 2);
        assert_eq!(text.lines().filter(|l| l.starts_with("grid y=")).count(), 2);
        assert!(text.contains("grid x=0.333"));
        assert!(!text.contains("<svg"));

        config.overlay.spiral = true;
        config.orientation = config.orientation.next();
        let text = render_overlays(&config);
        assert!(text.contains("<svg"));
        assert!(text.contains("rotate(90 "));
    }

    #[tokio::test]
    async fn test_run_script() {
        let sink = Arc::new(MemorySink::default());
        let mut coordinator = coordinator(sink.clone());
        coordinator.start().await;

        let (_tx, rx) = mpsc::unbounded_channel();
        let script = b"shoot\nbogus\n\nrec\nrec\nquit\nshoot\n";
        run(
            &mut coordinator,
            BufReader::new(&script[..]),
            rx,
            &StatusLine::with_visibility(false),
        )
        .await
        .unwrap();

        // The shoot after quit never ran; the clip was flushed at shutdown.
        let delivered = sink.delivered.lock().unwrap().clone();
        assert_eq!(delivered, vec![ArtifactKind::Photo, ArtifactKind::Video]);
        assert!(coordinator.store().get().status.stream.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_interrupt() {
        let mut coordinator = coordinator(Arc::new(MemorySink::default()));
        coordinator.start().await;

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();

        // Input never ends; only the interrupt can stop the loop.
        let (_writer, reader) = tokio::io::duplex(64);
        run(
            &mut coordinator,
            BufReader::new(reader),
            rx,
            &StatusLine::with_visibility(false),
        )
        .await
        .unwrap();

        assert!(coordinator.store().get().status.stream.is_none());
    }
}
