//! Armatures: bone hierarchies with rest matrices, pose state and the per-bone data that
//! retargeting reads (rotation mode, locks, constraints).

mod constraint;
mod roles;

pub use constraint::{
    AxisLimit, Constraint, ConstraintKind, ConstraintPolicy, LimitRotation, OwnerSpace,
    derive_order,
};
pub use roles::RoleTable;

use ahash::{HashMap, HashMapExt};
use glam::{DMat4, DQuat};
use thiserror::Error;

use crate::math::{self, RotationOrder};

pub type BoneIndex = usize;

/// Number of bone layers an armature has.
pub const LAYER_COUNT: usize = 32;

bitflags::bitflags! {
    /// Rotation axes a bone is not allowed to rotate about.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AxisLocks: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
    }
}

impl AxisLocks {
    /// The lock for axis index 0, 1 or 2.
    pub fn from_axis(axis: usize) -> Self {
        match axis {
            0 => AxisLocks::X,
            1 => AxisLocks::Y,
            2 => AxisLocks::Z,
            _ => AxisLocks::empty(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        s.chars().try_fold(AxisLocks::empty(), |locks, c| {
            Some(
                locks
                    | match c.to_ascii_uppercase() {
                        'X' => AxisLocks::X,
                        'Y' => AxisLocks::Y,
                        'Z' => AxisLocks::Z,
                        _ => return None,
                    },
            )
        })
    }
}

/// How a bone stores its local rotation when keyed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RotationMode {
    #[default]
    Quaternion,
    AxisAngle,
    Euler(RotationOrder),
}

impl std::str::FromStr for RotationMode {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUATERNION" => Ok(RotationMode::Quaternion),
            "AXIS_ANGLE" => Ok(RotationMode::AxisAngle),
            order => order.parse().map(RotationMode::Euler),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SkeletonError {
    #[error("Duplicate bone ({0})")]
    DuplicateBone(String),

    #[error("Bone {bone} has unknown parent ({parent})")]
    UnknownParent { bone: String, parent: String },

    #[error("Unknown bone ({0})")]
    UnknownBone(String),
}

#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneIndex>,
    /// Rest matrix relative to the armature origin.
    pub rest: DMat4,
    pub rotation_mode: RotationMode,
    pub lock_rotation: AxisLocks,
    pub constraints: Vec<Constraint>,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<BoneIndex>, rest: DMat4) -> Self {
        Self {
            name: name.into(),
            parent,
            rest,
            rotation_mode: RotationMode::default(),
            lock_rotation: AxisLocks::empty(),
            constraints: Vec::new(),
        }
    }
}

/// Local basis matrices of every bone, relative to the bone's parent and rest orientation.
/// Indices correspond to [BoneIndex] in the armature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    pub bones: Vec<DMat4>,
}

impl Pose {
    pub fn rest(bone_count: usize) -> Self {
        Self {
            bones: vec![DMat4::IDENTITY; bone_count],
        }
    }

    pub fn from_rotations(rotations: &[DQuat]) -> Self {
        Self {
            bones: rotations.iter().map(|&q| DMat4::from_quat(q)).collect(),
        }
    }
}

/// A bone hierarchy. Bones are stored parent-first, which [ArmatureBuilder] guarantees.
#[derive(Clone, Debug)]
pub struct Armature {
    pub name: String,
    bones: Vec<Bone>,
    names: HashMap<String, BoneIndex>,
    /// Current pose.
    pub pose: Pose,
    pub layers: [bool; LAYER_COUNT],
    /// Custom rig properties (IK switches, follow toggles, ...).
    pub properties: HashMap<String, f64>,
    /// A pose stored as this armature's T-pose, one rotation per bone.
    pub stored_t_pose: Option<Vec<DQuat>>,
}

impl Armature {
    pub fn builder(name: impl Into<String>) -> ArmatureBuilder {
        ArmatureBuilder {
            name: name.into(),
            bones: Vec::new(),
            names: HashMap::new(),
        }
    }

    #[inline]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn bone(&self, index: BoneIndex) -> &Bone {
        &self.bones[index]
    }

    #[inline]
    pub fn bone_mut(&mut self, index: BoneIndex) -> &mut Bone {
        &mut self.bones[index]
    }

    #[inline]
    pub fn find(&self, name: &str) -> Option<BoneIndex> {
        self.names.get(name).copied()
    }

    pub fn find_bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        self.find(name).map(|index| &mut self.bones[index])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// World matrix of a bone posed with `basis`, given its parent's world matrix.
    pub fn pose_matrix(
        &self,
        index: BoneIndex,
        basis: &DMat4,
        parent_world: Option<&DMat4>,
    ) -> DMat4 {
        let bone = &self.bones[index];
        match (bone.parent, parent_world) {
            (Some(parent), Some(parent_world)) => {
                *parent_world * self.bones[parent].rest.inverse() * bone.rest * *basis
            }
            _ => bone.rest * *basis,
        }
    }

    /// World matrices of all bones for the given pose.
    pub fn world_matrices(&self, pose: &Pose) -> Vec<DMat4> {
        let mut worlds: Vec<DMat4> = Vec::with_capacity(self.bones.len());

        for (index, bone) in self.bones.iter().enumerate() {
            let basis = pose.bones.get(index).copied().unwrap_or(DMat4::IDENTITY);
            let parent_world = bone.parent.map(|parent| worlds[parent]);
            let world = self.pose_matrix(index, &basis, parent_world.as_ref());
            worlds.push(world);
        }

        worlds
    }

    pub fn put_in_rest_pose(&mut self) {
        self.pose = Pose::rest(self.bones.len());
    }

    /// Store the current pose as this armature's T-pose.
    pub fn define_t_pose(&mut self) {
        let rotations = (0..self.bones.len())
            .map(|index| {
                let basis = self.pose.bones.get(index).copied().unwrap_or(DMat4::IDENTITY);
                math::decompose(&basis).0
            })
            .collect();
        self.stored_t_pose = Some(rotations);
    }

    pub fn undefine_t_pose(&mut self) {
        self.stored_t_pose = None;
    }

    pub fn property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).copied()
    }

    /// MakeHuman MHX rigs carry the `MhAlpha8` marker property.
    pub fn is_mhx(&self) -> bool {
        self.property("MhAlpha8").is_some_and(|value| value != 0.0)
    }

    pub fn is_rigify(&self) -> bool {
        self.find("MCH-spine.flex").is_some()
    }
}

pub struct ArmatureBuilder {
    name: String,
    bones: Vec<Bone>,
    names: HashMap<String, BoneIndex>,
}

impl ArmatureBuilder {
    /// Add a bone. The parent must already have been added.
    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<&str>,
        rest: DMat4,
    ) -> Result<&mut Bone, SkeletonError> {
        if self.names.contains_key(name) {
            return Err(SkeletonError::DuplicateBone(name.to_string()));
        }

        let parent = match parent {
            Some(parent) => Some(self.names.get(parent).copied().ok_or_else(|| {
                SkeletonError::UnknownParent {
                    bone: name.to_string(),
                    parent: parent.to_string(),
                }
            })?),
            None => None,
        };

        let index = self.bones.len();
        self.names.insert(name.to_string(), index);
        self.bones.push(Bone::new(name, parent, rest));

        Ok(&mut self.bones[index])
    }

    pub fn bone_mut(&mut self, name: &str) -> Result<&mut Bone, SkeletonError> {
        match self.names.get(name) {
            Some(&index) => Ok(&mut self.bones[index]),
            None => Err(SkeletonError::UnknownBone(name.to_string())),
        }
    }

    pub fn build(self) -> Armature {
        let bone_count = self.bones.len();
        Armature {
            name: self.name,
            bones: self.bones,
            names: self.names,
            pose: Pose::rest(bone_count),
            layers: [true; LAYER_COUNT],
            properties: HashMap::new(),
            stored_t_pose: None,
        }
    }
}
