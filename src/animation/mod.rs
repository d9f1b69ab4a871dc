mod action;
mod interpolate;
mod motion;
mod track;

pub use action::{Action, BoneCurves, BoneRotation, KeyframeSink};
pub use interpolate::Interpolate;
pub use motion::{AnimatedRig, Motion};
pub use track::{Interpolation, Key, Track};

/// Scene frame number.
pub type Frame = i32;
