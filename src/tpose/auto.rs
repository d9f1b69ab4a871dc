use std::f64::consts::FRAC_PI_2;

use tracing::info;

use crate::{
    math::{self, Euler, RotationOrder},
    skeleton::{Armature, RoleTable},
};

/// Desired world orientation of a limb in T-pose. `None` keeps the current angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TPoseEntry {
    pub role: &'static str,
    pub angles: [Option<f64>; 3],
    pub order: RotationOrder,
}

const fn entry(role: &'static str, x: f64, y: f64, z: f64) -> TPoseEntry {
    TPoseEntry {
        role,
        angles: [Some(x), Some(y), Some(z)],
        order: RotationOrder::XYZ,
    }
}

/// Arms horizontal, legs pointing down.
pub const DEFAULT_T_POSE: [TPoseEntry; 10] = [
    entry("shoulder.L", 0.0, 0.0, -FRAC_PI_2),
    entry("upper_arm.L", 0.0, 0.0, -FRAC_PI_2),
    entry("forearm.L", 0.0, 0.0, -FRAC_PI_2),
    entry("shoulder.R", 0.0, 0.0, FRAC_PI_2),
    entry("upper_arm.R", 0.0, 0.0, FRAC_PI_2),
    entry("forearm.R", 0.0, 0.0, FRAC_PI_2),
    entry("thigh.L", -FRAC_PI_2, 0.0, 0.0),
    entry("shin.L", -FRAC_PI_2, 0.0, 0.0),
    entry("thigh.R", -FRAC_PI_2, 0.0, 0.0),
    entry("shin.R", -FRAC_PI_2, 0.0, 0.0),
];

/// Rotate the limbs named in [DEFAULT_T_POSE] into T-pose, starting from rest. Each bone's
/// roll is cleared.
pub fn auto_t_pose(armature: &mut Armature, roles: &RoleTable) {
    info!("Auto T-pose {}", armature.name);
    armature.put_in_rest_pose();

    for index in 0..armature.len() {
        let Some(entry) = roles
            .role(index)
            .and_then(|role| DEFAULT_T_POSE.iter().find(|entry| entry.role == role))
        else {
            continue;
        };

        // Parents before children, so the parent world matrices are already posed.
        let worlds = armature.world_matrices(&armature.pose);
        let current = worlds[index];

        let mut euler = Euler::from_mat4(&current, entry.order);
        for (axis, angle) in entry.angles.iter().enumerate() {
            if let Some(angle) = angle {
                euler.set(axis, *angle);
            }
        }
        let mut desired = math::with_translation(euler.to_mat4(), math::translation(&current));

        let bone = armature.bone(index);
        let mut rest = bone.rest;
        if let Some(parent) = bone.parent {
            desired = worlds[parent].inverse() * desired;
            rest = armature.bone(parent).rest.inverse() * rest;
        }

        let mut basis = Euler::from_mat4(&(rest.inverse() * desired), RotationOrder::YZX);
        basis.set(1, 0.0);
        armature.pose.bones[index] = basis.to_mat4();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DMat4, DQuat, DVec3};

    /// A drooping left arm and a leg pointing down.
    fn armature() -> Armature {
        let arm_rest = DQuat::from_rotation_z(-FRAC_PI_2);
        let leg_rest = DQuat::from_rotation_x(std::f64::consts::PI);

        let mut builder = Armature::builder("rig");
        builder
            .add_bone("hips", None, DMat4::from_translation(DVec3::Z))
            .unwrap();
        builder
            .add_bone(
                "upper_arm.L",
                Some("hips"),
                math::compose(
                    arm_rest * DQuat::from_rotation_z(-0.3),
                    DVec3::new(0.2, 0.0, 1.5),
                ),
            )
            .unwrap();
        builder
            .add_bone(
                "forearm.L",
                Some("upper_arm.L"),
                math::compose(arm_rest, DVec3::new(0.5, 0.0, 1.5)),
            )
            .unwrap();
        builder
            .add_bone(
                "thigh.L",
                Some("hips"),
                math::compose(leg_rest, DVec3::new(0.1, 0.0, 1.0)),
            )
            .unwrap();
        builder.build()
    }

    #[test]
    fn limbs_reach_table_orientation() {
        let mut armature = armature();
        let roles = RoleTable::identity(&armature);
        auto_t_pose(&mut armature, &roles);

        let worlds = armature.world_matrices(&armature.pose);
        for (index, bone) in armature.bones().iter().enumerate() {
            let Some(entry) = DEFAULT_T_POSE.iter().find(|e| e.role == bone.name) else {
                assert_eq!(armature.pose.bones[index], DMat4::IDENTITY);
                continue;
            };
            let angles = entry.angles.map(|a| a.unwrap());
            let expected = Euler::new(DVec3::from_array(angles), entry.order).to_quat();
            let (actual, _) = math::decompose(&worlds[index]);
            assert!(
                actual.dot(expected).abs() > 1.0 - 1e-9,
                "{} is not in T-pose",
                bone.name
            );
        }
    }

    #[test]
    fn bone_heads_stay_in_place() {
        let mut armature = armature();
        let roles = RoleTable::identity(&armature);
        let rest = armature.world_matrices(&armature.pose);
        auto_t_pose(&mut armature, &roles);
        let posed = armature.world_matrices(&armature.pose);

        for index in 0..2 {
            assert!(
                math::translation(&posed[index])
                    .abs_diff_eq(math::translation(&rest[index]), 1e-9)
            );
        }
    }
}
