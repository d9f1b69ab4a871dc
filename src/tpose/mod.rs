//! Reference poses used to align two skeletons with different rest poses.

mod auto;
mod library;

pub use auto::{DEFAULT_T_POSE, TPoseEntry, auto_t_pose};
pub use library::{DEFAULT_T_POSE_NAME, TPoseLibrary};

use glam::{DMat4, DQuat};
use tracing::{info, warn};

use crate::{
    math,
    retarget::RetargetError,
    skeleton::{Armature, Pose, RoleTable},
};

/// Quaternions closer to identity than this are left out of saved poses.
const SAVE_EPSILON: f64 = 1e-4;

/// Which T-pose an armature is put in when it has no stored T-pose.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TPoseChoice {
    /// Computed from the built-in limb table.
    #[default]
    Default,
    /// A table loaded through a [TPoseLibrary].
    Named(String),
}

impl TPoseChoice {
    pub fn name(&self) -> &str {
        match self {
            TPoseChoice::Default => DEFAULT_T_POSE_NAME,
            TPoseChoice::Named(name) => name,
        }
    }
}

impl std::str::FromStr for TPoseChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case(DEFAULT_T_POSE_NAME) {
            TPoseChoice::Default
        } else {
            TPoseChoice::Named(s.to_string())
        })
    }
}

impl std::fmt::Display for TPoseChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Local rotations keyed by role.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TPoseTable {
    pub name: String,
    pub bones: Vec<(String, DQuat)>,
}

/// Put `armature` in its T-pose. A stored T-pose wins over `choice`.
pub fn put_in_t_pose(
    armature: &mut Armature,
    roles: &RoleTable,
    choice: &TPoseChoice,
    library: Option<&mut TPoseLibrary>,
) -> Result<(), RetargetError> {
    if let Some(ref stored) = armature.stored_t_pose {
        if stored.len() != armature.len() {
            return Err(RetargetError::ConstraintResolution(format!(
                "Stored T-pose of {} has {} bones, armature has {}",
                armature.name,
                stored.len(),
                armature.len()
            )));
        }
        armature.pose = Pose::from_rotations(stored);
        return Ok(());
    }

    match choice {
        TPoseChoice::Default => {
            auto_t_pose(armature, roles);
            Ok(())
        }
        TPoseChoice::Named(name) => {
            let Some(library) = library else {
                return Err(RetargetError::ConstraintResolution(format!(
                    "No T-pose library to load {name} from"
                )));
            };
            let table = library.load(name)?;
            set_t_pose(armature, roles, table);
            Ok(())
        }
    }
}

/// Rest pose, then every role in `table` gets its rotation.
pub fn set_t_pose(armature: &mut Armature, roles: &RoleTable, table: &TPoseTable) {
    info!("Setting T-pose {} on {}", table.name, armature.name);
    armature.put_in_rest_pose();
    for (role, rotation) in table.bones.iter() {
        match roles.bone(role) {
            Some(bone) => armature.pose.bones[bone] = DMat4::from_quat(*rotation),
            None => warn!("T-pose bone {role} not found in {}", armature.name),
        }
    }
}

/// `A = rot(source)⁻¹ · rot(target)` from the world matrices of a bone pair in T-pose.
pub fn alignment_matrix(source_world: &DMat4, target_world: &DMat4) -> DMat4 {
    math::rotation_part(source_world).inverse() * math::rotation_part(target_world)
}

/// The current pose as a table. Bones without a role and bones at rest are left out.
pub fn save_pose(armature: &Armature, roles: &RoleTable, name: &str) -> TPoseTable {
    let worlds = armature.world_matrices(&armature.pose);

    let bones = armature
        .bones()
        .iter()
        .enumerate()
        .filter_map(|(index, bone)| {
            let role = roles.role(index)?;

            let (world, rest) = match bone.parent {
                Some(parent) => (
                    worlds[parent].inverse() * worlds[index],
                    armature.bone(parent).rest.inverse() * bone.rest,
                ),
                None => (worlds[index], bone.rest),
            };
            let (rotation, _) = math::decompose(&(rest.inverse() * world));

            let offset = (rotation.w - 1.0).powi(2)
                + rotation.x.powi(2)
                + rotation.y.powi(2)
                + rotation.z.powi(2);
            (offset.sqrt() > SAVE_EPSILON).then(|| (role.to_string(), rotation))
        })
        .collect();

    TPoseTable {
        name: name.to_string(),
        bones,
    }
}
