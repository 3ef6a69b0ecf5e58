//! CLI enum types for facing and overlay orientation options.

use clap::ValueEnum;

use crate::overlay::Orientation;
use crate::session::Facing;

/// Camera to open first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FacingArg {
    #[default]
    Rear,
    Front,
}

impl From<FacingArg> for Facing {
    fn from(f: FacingArg) -> Self {
        match f {
            FacingArg::Rear => Facing::Rear,
            FacingArg::Front => Facing::Front,
        }
    }
}

/// Golden spiral orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OrientationArg {
    #[default]
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl From<OrientationArg> for Orientation {
    fn from(o: OrientationArg) -> Self {
        match o {
            OrientationArg::TopLeft => Orientation::TopLeft,
            OrientationArg::TopRight => Orientation::TopRight,
            OrientationArg::BottomRight => Orientation::BottomRight,
            OrientationArg::BottomLeft => Orientation::BottomLeft,
        }
    }
}
