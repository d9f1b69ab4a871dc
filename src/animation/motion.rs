use std::cell::RefCell;

use ahash::{HashMap, HashMapExt};
use glam::{DMat4, DQuat, DVec3};

use crate::{
    math::Transform,
    retarget::{RetargetError, SourceRig},
    skeleton::{Armature, BoneIndex, Pose},
};

use super::{Frame, track::Track};

/// Local key frames for the bones of an armature, relative to each bone's rest orientation.
#[derive(Clone, Debug, Default)]
pub struct Motion {
    pub name: String,
    pub translations: HashMap<BoneIndex, Track<DVec3>>,
    pub rotations: HashMap<BoneIndex, Track<DQuat>>,
}

impl Motion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translations: HashMap::new(),
            rotations: HashMap::new(),
        }
    }

    pub fn insert_translation(&mut self, bone: BoneIndex, frame: Frame, translation: DVec3) {
        self.translations
            .entry(bone)
            .or_default()
            .insert(frame, translation);
    }

    pub fn insert_rotation(&mut self, bone: BoneIndex, frame: Frame, rotation: DQuat) {
        self.rotations.entry(bone).or_default().insert(frame, rotation);
    }

    /// Every frame that carries a key on any track, ascending.
    pub fn frames(&self) -> Vec<Frame> {
        let mut frames: Vec<Frame> = self
            .translations
            .values()
            .flat_map(|track| track.keys().iter().map(|k| k.frame))
            .chain(
                self.rotations
                    .values()
                    .flat_map(|track| track.keys().iter().map(|k| k.frame)),
            )
            .collect();
        frames.sort_unstable();
        frames.dedup();
        frames
    }

    /// Sample every track at `frame`. Bones without tracks stay at rest.
    pub fn pose_at(&self, bone_count: usize, frame: Frame) -> Pose {
        let time = frame as f64;

        let bones = (0..bone_count)
            .map(|bone| {
                let translation = self
                    .translations
                    .get(&bone)
                    .map(|t| t.sample(time))
                    .unwrap_or(DVec3::ZERO);
                let rotation = self
                    .rotations
                    .get(&bone)
                    .map(|t| t.sample(time))
                    .unwrap_or(DQuat::IDENTITY);

                Transform::new(translation, rotation).to_mat4()
            })
            .collect();

        Pose { bones }
    }
}

/// A source armature driven by a [Motion].
pub struct AnimatedRig {
    armature: Armature,
    motion: Motion,
    /// World matrices of the last evaluated frame.
    cache: RefCell<Option<(Frame, Vec<DMat4>)>>,
}

impl AnimatedRig {
    pub fn new(armature: Armature, motion: Motion) -> Self {
        Self {
            armature,
            motion,
            cache: RefCell::new(None),
        }
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    /// Mutable access to the armature, e.g. to store a T-pose.
    pub fn armature_mut(&mut self) -> &mut Armature {
        *self.cache.get_mut() = None;
        &mut self.armature
    }

    fn evaluate(&self, frame: Frame) -> Vec<DMat4> {
        let pose = self.motion.pose_at(self.armature.len(), frame);
        self.armature.world_matrices(&pose)
    }
}

impl SourceRig for AnimatedRig {
    fn armature(&self) -> &Armature {
        &self.armature
    }

    fn frames(&self) -> Vec<Frame> {
        self.motion.frames()
    }

    fn world_matrix(&self, bone: BoneIndex, frame: Frame) -> Result<DMat4, RetargetError> {
        let mut cache = self.cache.borrow_mut();

        let stale = cache.as_ref().is_none_or(|(cached, _)| *cached != frame);
        if stale {
            *cache = Some((frame, self.evaluate(frame)));
        }

        cache
            .as_ref()
            .and_then(|(_, worlds)| worlds.get(bone).copied())
            .ok_or_else(|| RetargetError::MissingBone {
                bone: format!("#{bone}"),
                frame,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math;

    fn rig() -> AnimatedRig {
        let mut builder = Armature::builder("source");
        builder.add_bone("hips", None, DMat4::IDENTITY).unwrap();
        builder
            .add_bone(
                "spine",
                Some("hips"),
                DMat4::from_translation(DVec3::new(0.0, 1.0, 0.0)),
            )
            .unwrap();
        let armature = builder.build();

        let mut motion = Motion::new("walk");
        motion.insert_translation(0, 1, DVec3::new(0.0, 0.0, 0.0));
        motion.insert_translation(0, 11, DVec3::new(10.0, 0.0, 0.0));
        motion.insert_rotation(1, 5, DQuat::from_rotation_z(0.5));

        AnimatedRig::new(armature, motion)
    }

    #[test]
    fn frames_are_the_union_of_all_keys() {
        let rig = rig();
        assert_eq!(rig.frames(), vec![1, 5, 11]);
    }

    #[test]
    fn world_matrix_follows_the_parent() {
        let rig = rig();
        let spine = rig.world_matrix(1, 6).unwrap();
        assert!(math::translation(&spine).abs_diff_eq(DVec3::new(5.0, 1.0, 0.0), 1e-12));

        let hips = rig.world_matrix(0, 11).unwrap();
        assert!(math::translation(&hips).abs_diff_eq(DVec3::new(10.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn unknown_bone_is_an_error() {
        let rig = rig();
        assert!(matches!(
            rig.world_matrix(7, 1),
            Err(RetargetError::MissingBone { frame: 1, .. })
        ));
    }
}
