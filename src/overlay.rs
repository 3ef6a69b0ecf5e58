//! Composition guide renderers.
//!
//! Pure functions of `(orientation, visible)`: a golden-ratio spiral with its
//! Fibonacci rectangles, and a rule-of-thirds grid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Corner the spiral converges away from.
///
/// Rotates clockwise: TopLeft -> TopRight -> BottomRight -> BottomLeft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Orientation {
    /// One clockwise step.
    pub fn next(&self) -> Self {
        match self {
            Orientation::TopLeft => Orientation::TopRight,
            Orientation::TopRight => Orientation::BottomRight,
            Orientation::BottomRight => Orientation::BottomLeft,
            Orientation::BottomLeft => Orientation::TopLeft,
        }
    }

    pub fn rotation_degrees(&self) -> u16 {
        match self {
            Orientation::TopLeft => 0,
            Orientation::TopRight => 90,
            Orientation::BottomRight => 180,
            Orientation::BottomLeft => 270,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Orientation::TopLeft => "top-left",
            Orientation::TopRight => "top-right",
            Orientation::BottomRight => "bottom-right",
            Orientation::BottomLeft => "bottom-left",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Golden rectangle view box.
const VIEW_WIDTH: u32 = 1000;
const VIEW_HEIGHT: u32 = 618;

/// Fibonacci subdivisions as (x, y, side).
const SQUARES: [(u32, u32, u32); 5] = [
    (0, 0, 618),
    (618, 0, 382),
    (764, 382, 236),
    (618, 472, 146),
    (618, 382, 90),
];

const SPIRAL_PATH: &str = "M 0 618 A 618 618 0 0 1 618 0 A 382 382 0 0 1 1000 382 \
A 236 236 0 0 1 764 618 A 146 146 0 0 1 618 472 A 90 90 0 0 1 708 382";

/// Focal point where the spiral converges.
pub const FOCAL_POINT: (u32, u32) = (708, 472);

/// Render the spiral guide as an SVG document, or nothing when hidden.
pub fn spiral_svg(orientation: Orientation, visible: bool) -> Option<String> {
    if !visible {
        return None;
    }

    let cx = VIEW_WIDTH / 2;
    let cy = VIEW_HEIGHT / 2;
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {VIEW_WIDTH} {VIEW_HEIGHT}\" \
preserveAspectRatio=\"none\">\n<g transform=\"rotate({} {cx} {cy})\">\n",
        orientation.rotation_degrees()
    );

    svg.push_str("<g stroke=\"rgba(255,255,255,0.9)\" stroke-width=\"1.5\" fill=\"none\">\n");
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{VIEW_WIDTH}\" height=\"{VIEW_HEIGHT}\"/>\n"
    ));
    for (x, y, side) in SQUARES {
        svg.push_str(&format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{side}\" height=\"{side}\"/>\n"
        ));
    }
    svg.push_str("</g>\n");

    svg.push_str(&format!(
        "<path d=\"{SPIRAL_PATH}\" stroke=\"#ffff00\" stroke-width=\"3\" fill=\"none\" \
stroke-linecap=\"round\"/>\n"
    ));
    let (fx, fy) = FOCAL_POINT;
    svg.push_str(&format!(
        "<circle cx=\"{fx}\" cy=\"{fy}\" r=\"6\" fill=\"#ffff00\"/>\n"
    ));
    svg.push_str("</g>\n</svg>\n");
    Some(svg)
}

/// Axis of a grid line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// A guide line at a fraction of the frame (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub axis: Axis,
    pub position: f32,
}

/// Rule-of-thirds lines, or none when hidden.
pub fn grid_lines(visible: bool) -> Vec<GridLine> {
    if !visible {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(4);
    for axis in [Axis::Vertical, Axis::Horizontal] {
        for third in [1.0 / 3.0, 2.0 / 3.0] {
            lines.push(GridLine {
                axis,
                position: third,
            });
        }
    }
    lines
}
