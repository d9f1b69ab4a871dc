use glam::DMat4;

use crate::{
    animation::{BoneRotation, Frame, KeyframeSink},
    math,
    skeleton::{Armature, Bone, BoneIndex, ConstraintPolicy},
    tpose,
};

use super::RetargetError;

/// Where a unit's target world matrix is expressed relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitLink {
    /// No mapped ancestor; the unit keys location as well as rotation.
    Root,
    /// Index of the unit retargeting the nearest mapped ancestor.
    Child(usize),
}

/// Retargets one source bone onto one target bone.
#[derive(Clone, Debug)]
pub struct BoneRetargetUnit {
    pub source: BoneIndex,
    pub target: BoneIndex,
    pub link: UnitLink,
    /// `R_target⁻¹ · R_parent`, or `R_target⁻¹` for roots.
    b_matrix: DMat4,
    /// T-pose alignment, set by [BoneRetargetUnit::align].
    a_matrix: Option<DMat4>,
    policy: ConstraintPolicy,
    source_world: DMat4,
    target_world: DMat4,
}

impl BoneRetargetUnit {
    /// `parent` is the parent unit's index and its target bone.
    pub fn new(
        source: BoneIndex,
        target: BoneIndex,
        parent: Option<(usize, BoneIndex)>,
        armature: &Armature,
        use_limits: bool,
    ) -> Self {
        let bone = armature.bone(target);
        let rest_inverse = bone.rest.inverse();

        let (link, b_matrix) = match parent {
            Some((unit, parent_bone)) => (
                UnitLink::Child(unit),
                rest_inverse * armature.bone(parent_bone).rest,
            ),
            None => (UnitLink::Root, rest_inverse),
        };

        Self {
            source,
            target,
            link,
            b_matrix,
            a_matrix: None,
            policy: ConstraintPolicy::for_bone(bone, use_limits),
            source_world: DMat4::IDENTITY,
            target_world: DMat4::IDENTITY,
        }
    }

    /// Compute the alignment from both bones' world matrices while in T-pose.
    pub fn align(&mut self, source_t_pose: &DMat4, target_t_pose: &DMat4) {
        self.a_matrix = Some(tpose::alignment_matrix(source_t_pose, target_t_pose));
    }

    pub fn a_matrix(&self) -> Option<DMat4> {
        self.a_matrix
    }

    pub fn b_matrix(&self) -> DMat4 {
        self.b_matrix
    }

    pub fn policy(&self) -> &ConstraintPolicy {
        &self.policy
    }

    /// Target world matrix of the last retargeted frame, after constraints.
    #[inline]
    pub fn world_matrix(&self) -> DMat4 {
        self.target_world
    }

    /// Source world matrix of the last retargeted frame.
    #[inline]
    pub fn source_matrix(&self) -> DMat4 {
        self.source_world
    }

    /// Retarget one frame and key the result into `sink`. `parent_world` is the parent unit's
    /// [world_matrix](Self::world_matrix) for the same frame. Returns the keyed local matrix.
    pub fn retarget<K: KeyframeSink + ?Sized>(
        &mut self,
        frame: Frame,
        source_world: DMat4,
        parent_world: Option<&DMat4>,
        bone: &Bone,
        sink: &mut K,
    ) -> Result<DMat4, RetargetError> {
        let Some(a_matrix) = self.a_matrix else {
            return Err(RetargetError::Configuration(format!(
                "{} retargeted before T-pose alignment",
                bone.name
            )));
        };

        let parent_world = match (self.link, parent_world) {
            (UnitLink::Root, _) => None,
            (UnitLink::Child(_), Some(parent_world)) => Some(parent_world),
            (UnitLink::Child(_), None) => {
                return Err(RetargetError::Configuration(format!(
                    "{} retargeted without its parent",
                    bone.name
                )));
            }
        };

        self.source_world = source_world;
        let target_world =
            math::with_translation(source_world * a_matrix, math::translation(&source_world));

        let delta = match parent_world {
            Some(parent_world) => parent_world.inverse() * target_world,
            None => target_world,
        };
        let local = self.policy.correct_for_locks(self.b_matrix * delta, &bone.constraints);

        let (rotation, location) = math::decompose(&local);
        sink.insert_rotation(
            &bone.name,
            frame,
            BoneRotation::for_mode(bone.rotation_mode, rotation),
        );
        if self.link == UnitLink::Root {
            sink.insert_location(&bone.name, frame, location);
        }

        let corrected = self.b_matrix.inverse() * local;
        self.target_world = match parent_world {
            Some(parent_world) => *parent_world * corrected,
            None => corrected,
        };

        Ok(local)
    }
}
