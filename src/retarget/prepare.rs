use tracing::debug;

use crate::skeleton::{Armature, AxisLocks, BoneIndex, ConstraintKind, LAYER_COUNT, Pose};

use super::RetargetOptions;

/// Rig switches forced to neutral values while retargeting and restored afterwards.
const TEMPORARY_PROPERTIES: [(&str, f64); 9] = [
    ("MhaRotationLimits", 0.0),
    ("MhaArmIk_L", 0.0),
    ("MhaArmIk_R", 0.0),
    ("MhaLegIk_L", 0.0),
    ("MhaLegIk_R", 0.0),
    ("MhaSpineIk", 0.0),
    ("MhaSpineInvert", 0.0),
    ("MhaElbowPlant_L", 0.0),
    ("MhaElbowPlant_R", 0.0),
];

/// Follow and hinge switches, suffixed with `_L` and `_R`. These are switched off for good.
const PERMANENT_PROPERTIES: [&str; 6] = [
    "MhaElbowFollowsShoulder",
    "MhaElbowFollowsWrist",
    "MhaKneeFollowsHip",
    "MhaKneeFollowsFoot",
    "MhaArmHinge",
    "MhaLegHinge",
];

/// Layers 0-7 and 16-23 visible.
fn mhx_layers() -> [bool; LAYER_COUNT] {
    std::array::from_fn(|layer| (layer / 8) % 2 == 0)
}

/// Layers 0-26 visible.
fn rigify_layers() -> [bool; LAYER_COUNT] {
    std::array::from_fn(|layer| layer < 27)
}

/// Target state changed for the duration of a session.
pub(crate) struct TargetSnapshot {
    properties: Vec<(String, f64)>,
    layers: [bool; LAYER_COUNT],
    /// `(bone, constraint, mute)`
    mutes: Vec<(BoneIndex, usize, bool)>,
    locks: Vec<(BoneIndex, AxisLocks)>,
    /// `(bone, constraint, enabled x, enabled z)`
    limit_axes: Vec<(BoneIndex, usize, bool, bool)>,
    pose: Pose,
}

impl TargetSnapshot {
    /// Neutralise the parts of `armature` that interfere with retargeting. `mapped` are the
    /// target bones that will be keyed.
    pub fn prepare(
        armature: &mut Armature,
        mapped: &[BoneIndex],
        options: &RetargetOptions,
    ) -> Self {
        let mut snapshot = Self {
            properties: Vec::new(),
            layers: armature.layers,
            mutes: Vec::new(),
            locks: Vec::new(),
            limit_axes: Vec::new(),
            pose: armature.pose.clone(),
        };

        for (key, value) in TEMPORARY_PROPERTIES {
            if let Some(old) = armature.properties.get_mut(key) {
                snapshot.properties.push((key.to_string(), *old));
                *old = value;
            }
        }

        for key in PERMANENT_PROPERTIES {
            let left = format!("{key}_L");
            if armature.properties.contains_key(&left) {
                armature.properties.insert(left, 0.0);
                armature.properties.insert(format!("{key}_R"), 0.0);
            }
        }

        if armature.is_mhx() {
            armature.layers = mhx_layers();
        } else if armature.is_rigify() {
            armature.layers = rigify_layers();
        }

        if !options.use_limits {
            for bone in 0..armature.len() {
                let constraints = &mut armature.bone_mut(bone).constraints;
                for (index, constraint) in constraints.iter_mut().enumerate() {
                    if constraint.kind == ConstraintKind::LimitDistance {
                        constraint.mute = true;
                    } else if constraint.is_limit() {
                        snapshot.mutes.push((bone, index, constraint.mute));
                        constraint.mute = true;
                    }
                }
            }
        }

        if options.clear_locks {
            for &bone in mapped {
                let bone_data = armature.bone_mut(bone);
                snapshot.locks.push((bone, bone_data.lock_rotation));
                bone_data.lock_rotation.remove(AxisLocks::X | AxisLocks::Z);

                for (index, constraint) in bone_data.constraints.iter_mut().enumerate() {
                    if let ConstraintKind::LimitRotation(ref mut limit) = constraint.kind {
                        snapshot.limit_axes.push((
                            bone,
                            index,
                            limit.axes[0].enabled,
                            limit.axes[2].enabled,
                        ));
                        limit.axes[0].enabled = false;
                        limit.axes[2].enabled = false;
                    }
                }
            }
        }

        debug!(
            "Prepared {}: {} properties, {} constraints muted, {} bones unlocked",
            armature.name,
            snapshot.properties.len(),
            snapshot.mutes.len(),
            snapshot.locks.len()
        );

        snapshot
    }

    pub fn restore(self, armature: &mut Armature) {
        armature.layers = self.layers;

        for (key, value) in self.properties {
            armature.properties.insert(key, value);
        }

        for (bone, constraint, mute) in self.mutes {
            armature.bone_mut(bone).constraints[constraint].mute = mute;
        }

        for (bone, locks) in self.locks {
            armature.bone_mut(bone).lock_rotation = locks;
        }

        for (bone, constraint, x, z) in self.limit_axes {
            if let ConstraintKind::LimitRotation(ref mut limit) =
                armature.bone_mut(bone).constraints[constraint].kind
            {
                limit.axes[0].enabled = x;
                limit.axes[2].enabled = z;
            }
        }

        armature.pose = self.pose;
    }
}
