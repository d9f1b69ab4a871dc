//! Transfers animation from a source armature onto a target armature.

mod error;
mod mapping;
mod prepare;
mod session;
mod unit;


pub use error::{MappingError, RetargetError};
pub use mapping::{Mapping, UnitSpec};
pub use session::{RetargetReport, RetargetSession, SessionState};
pub use unit::{BoneRetargetUnit, UnitLink};

use glam::DMat4;

use crate::{
    animation::Frame,
    skeleton::{Armature, BoneIndex},
    tpose::TPoseChoice,
};

/// Frames retargeted between two progress reports.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// An armature with a world matrix for every bone at every animated frame.
pub trait SourceRig {
    fn armature(&self) -> &Armature;

    /// Animated frames, ascending.
    fn frames(&self) -> Vec<Frame>;

    /// World matrix of `bone` at `frame`.
    fn world_matrix(&self, bone: BoneIndex, frame: Frame) -> Result<DMat4, RetargetError>;

    /// Canonical role of `bone`, used to find it in T-pose tables.
    fn role(&self, bone: BoneIndex) -> Option<&str> {
        Some(self.armature().bone(bone).name.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetargetOptions {
    /// Clamp to `LimitRotation` constraints. When off, limit constraints are muted.
    pub use_limits: bool,
    /// Unlock X and Z rotation of mapped bones for the duration of the session.
    pub clear_locks: bool,
    pub batch_size: usize,
    pub source_t_pose: TPoseChoice,
    pub target_t_pose: TPoseChoice,
}

impl Default for RetargetOptions {
    fn default() -> Self {
        Self {
            use_limits: true,
            clear_locks: false,
            batch_size: DEFAULT_BATCH_SIZE,
            source_t_pose: TPoseChoice::Default,
            target_t_pose: TPoseChoice::Default,
        }
    }
}

/// `target[..4] + source[2..]`, counted in characters.
pub fn action_name(target: &str, source: &str) -> String {
    target.chars().take(4).chain(source.chars().skip(2)).collect()
}
