use ahash::{HashMap, HashMapExt};
use glam::{DQuat, DVec3, DVec4};

use crate::{
    math::{Euler, RotationOrder},
    skeleton::RotationMode,
};

use super::{
    Frame,
    track::{Interpolation, Track},
};

/// A local bone rotation in the representation the bone keys it in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoneRotation {
    Quaternion(DQuat),
    Euler(Euler),
    AxisAngle { axis: DVec3, angle: f64 },
}

impl BoneRotation {
    pub fn for_mode(mode: RotationMode, rotation: DQuat) -> Self {
        match mode {
            RotationMode::Quaternion => BoneRotation::Quaternion(rotation),
            RotationMode::Euler(order) => BoneRotation::Euler(Euler::from_quat(rotation, order)),
            RotationMode::AxisAngle => {
                let (axis, angle) = rotation.to_axis_angle();
                BoneRotation::AxisAngle { axis, angle }
            }
        }
    }

    pub fn to_quat(&self) -> DQuat {
        match *self {
            BoneRotation::Quaternion(rotation) => rotation,
            BoneRotation::Euler(ref euler) => euler.to_quat(),
            BoneRotation::AxisAngle { axis, angle } => DQuat::from_axis_angle(axis, angle),
        }
    }
}

/// Receives the local transforms produced by retargeting.
pub trait KeyframeSink {
    fn insert_rotation(&mut self, bone: &str, frame: Frame, rotation: BoneRotation);

    fn insert_location(&mut self, bone: &str, frame: Frame, location: DVec3);

    /// Called once after a successful session: linear interpolation, constant extrapolation.
    fn finish(&mut self);
}

/// Curves keyed for one bone.
#[derive(Clone, Debug, Default)]
pub struct BoneCurves {
    pub rotation_quaternion: Track<DQuat>,
    pub rotation_euler: Track<DVec3>,
    pub euler_order: RotationOrder,
    /// `(angle, x, y, z)`
    pub rotation_axis_angle: Track<DVec4>,
    pub location: Track<DVec3>,
}

impl BoneCurves {
    fn set_interpolation(&mut self, interpolation: Interpolation) {
        macro_rules! apply {
            ($($track:ident),*) => {
                $(self.$track.interpolation = interpolation;)*
            };
        }
        apply!(rotation_quaternion, rotation_euler, rotation_axis_angle, location);
    }

    /// The keyed rotation at `frame`, whichever representation was keyed.
    pub fn rotation_at(&self, frame: Frame) -> Option<DQuat> {
        if let Some(rotation) = self.rotation_quaternion.key_at(frame) {
            return Some(rotation);
        }
        if let Some(angles) = self.rotation_euler.key_at(frame) {
            return Some(Euler::new(angles, self.euler_order).to_quat());
        }
        self.rotation_axis_angle
            .key_at(frame)
            .map(|v| DQuat::from_axis_angle(DVec3::new(v.y, v.z, v.w), v.x))
    }
}

/// Named collection of bone curves; the in-memory keyframe sink.
#[derive(Clone, Debug)]
pub struct Action {
    pub name: String,
    curves: HashMap<String, BoneCurves>,
    finished: bool,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: HashMap::new(),
            finished: false,
        }
    }

    pub fn curves(&self, bone: &str) -> Option<&BoneCurves> {
        self.curves.get(bone)
    }

    pub fn bones(&self) -> impl Iterator<Item = &str> {
        self.curves.keys().map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        for curves in self.curves.values_mut() {
            curves.set_interpolation(interpolation);
        }
    }
}

impl KeyframeSink for Action {
    fn insert_rotation(&mut self, bone: &str, frame: Frame, rotation: BoneRotation) {
        let curves = self.curves.entry(bone.to_string()).or_default();
        match rotation {
            BoneRotation::Quaternion(rotation) => curves.rotation_quaternion.insert(frame, rotation),
            BoneRotation::Euler(euler) => {
                curves.euler_order = euler.order;
                curves.rotation_euler.insert(frame, euler.angles);
            }
            BoneRotation::AxisAngle { axis, angle } => curves
                .rotation_axis_angle
                .insert(frame, DVec4::new(angle, axis.x, axis.y, axis.z)),
        }
    }

    fn insert_location(&mut self, bone: &str, frame: Frame, location: DVec3) {
        self.curves
            .entry(bone.to_string())
            .or_default()
            .location
            .insert(frame, location);
    }

    fn finish(&mut self) {
        self.set_interpolation(Interpolation::Linear);
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_keyed_in_the_bone_representation() {
        let rotation = DQuat::from_rotation_x(0.4) * DQuat::from_rotation_z(-0.2);

        let mut action = Action::new("test");
        action.insert_rotation(
            "quat",
            1,
            BoneRotation::for_mode(RotationMode::Quaternion, rotation),
        );
        action.insert_rotation(
            "euler",
            1,
            BoneRotation::for_mode(RotationMode::Euler(RotationOrder::ZXY), rotation),
        );
        action.insert_rotation(
            "axis",
            1,
            BoneRotation::for_mode(RotationMode::AxisAngle, rotation),
        );

        let euler = action.curves("euler").unwrap();
        assert_eq!(euler.euler_order, RotationOrder::ZXY);
        assert!(euler.rotation_quaternion.is_empty());
        assert_eq!(euler.rotation_euler.len(), 1);

        for bone in ["quat", "euler", "axis"] {
            let keyed = action.curves(bone).unwrap().rotation_at(1).unwrap();
            assert!(keyed.dot(rotation).abs() > 1.0 - 1e-12, "{bone}");
        }
    }

    #[test]
    fn finish_sets_linear_interpolation_and_constant_extrapolation() {
        let mut action = Action::new("test");
        action.insert_location("root", 1, DVec3::ZERO);
        action.insert_location("root", 10, DVec3::X);
        action.curves.get_mut("root").unwrap().location.interpolation = Interpolation::Constant;

        action.finish();

        let location = &action.curves("root").unwrap().location;
        assert!(action.is_finished());
        assert_eq!(location.interpolation, Interpolation::Linear);
        assert_eq!(location.sample(20.0), DVec3::X);
    }
}
