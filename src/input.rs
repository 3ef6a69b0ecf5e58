//! Line input handling.
//!
//! Each line typed into the viewfinder is one command. Commands have a long
//! name and a one-letter shortcut (`shoot` / `s`).

use crate::store::SelfTimer;

/// A viewfinder command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Shutter (respects the self-timer)
    Shoot,
    /// Start or stop recording
    Record,
    /// Toggle front/rear camera
    Switch,
    /// Rotate the spiral clockwise
    Rotate,
    ToggleGrid,
    ToggleSpiral,
    /// Set the self-timer, or cycle it when no value is given
    Timer(Option<SelfTimer>),
    /// Abort a running countdown
    Cancel,
    Zoom(f64),
    Focus,
    /// Re-acquire the camera after an error
    Retry,
    /// Print the full state as JSON
    Status,
    /// Print the visible composition guides
    Overlay,
    Offline,
    Online,
    /// The platform offers to install the app
    Installable,
    /// Accept a pending install offer
    Install,
    Help,
    Quit,
}

/// Result of parsing an input line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    /// A valid command
    Run(Action),
    /// Blank line
    None,
    /// Unknown command or bad argument, with a message for the user
    Invalid(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  shoot  (s)          take a photo (after the self-timer, if set)
  rec    (r)          start/stop recording
  switch (w)          switch between front and rear camera
  rotate (o)          rotate the golden spiral clockwise
  spiral (p)          show/hide the golden spiral
  grid   (g)          show/hide the rule-of-thirds grid
  timer  (t) [0|3|5|10]  set the self-timer (no value cycles)
  cancel (c)          cancel a running self-timer
  zoom   (z) <1.0-5.0>   set the zoom factor
  focus  (f)          refocus
  retry               retry the camera after an error
  status              print the current state
  overlay (v)         print the visible guides (spiral SVG, grid lines)
  offline | online    simulate connectivity changes
  installable         simulate an install offer from the platform
  install             accept a pending install offer
  help   (h, ?)       show this help
  quit   (q)          exit";

/// Parse one input line into a command.
pub fn parse_line(line: &str) -> LineAction {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return LineAction::None;
    };
    let argument = words.next();

    let action = match command.to_ascii_lowercase().as_str() {
        "shoot" | "s" | "snap" => Action::Shoot,
        "rec" | "r" | "record" => Action::Record,
        "switch" | "w" => Action::Switch,
        "rotate" | "o" => Action::Rotate,
        "grid" | "g" => Action::ToggleGrid,
        "spiral" | "p" => Action::ToggleSpiral,
        "timer" | "t" => match argument {
            None => Action::Timer(None),
            Some(value) => match parse_timer(value) {
                Ok(timer) => Action::Timer(Some(timer)),
                Err(message) => return LineAction::Invalid(message),
            },
        },
        "cancel" | "c" => Action::Cancel,
        "zoom" | "z" => match argument.map(str::parse::<f64>) {
            Some(Ok(factor)) if factor.is_finite() => Action::Zoom(factor),
            Some(_) => {
                return LineAction::Invalid(format!(
                    "'{}' is not a valid zoom factor",
                    argument.unwrap_or_default()
                ))
            }
            None => return LineAction::Invalid("zoom needs a factor, e.g. 'zoom 2.5'".into()),
        },
        "focus" | "f" => Action::Focus,
        "retry" => Action::Retry,
        "status" => Action::Status,
        "overlay" | "v" => Action::Overlay,
        "offline" => Action::Offline,
        "online" => Action::Online,
        "installable" => Action::Installable,
        "install" => Action::Install,
        "help" | "h" | "?" => Action::Help,
        "quit" | "q" | "exit" => Action::Quit,
        other => {
            return LineAction::Invalid(format!(
                "Unknown command '{}'. Type 'help' for commands.",
                other
            ))
        }
    };
    LineAction::Run(action)
}

fn parse_timer(value: &str) -> Result<SelfTimer, String> {
    let seconds: u32 = value
        .trim_end_matches('s')
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", value))?;
    SelfTimer::try_from(seconds)
}
