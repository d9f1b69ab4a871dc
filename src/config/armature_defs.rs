use glam::{DQuat, DVec3};

use crate::{
    math,
    skeleton::{
        Armature, AxisLimit, AxisLocks, Bone, Constraint, ConstraintKind, LAYER_COUNT,
        LimitRotation, OwnerSpace, RotationMode,
    },
};

use super::{ConfigError, ConfigLine, ConfigLines};

const DEFAULT_LIMIT_NAME: &str = "Limit Rotation";

fn axis_index(line: &ConfigLine, index: usize) -> Result<usize, ConfigError> {
    match line.require_string(index)?.to_ascii_uppercase().as_str() {
        "X" => Ok(0),
        "Y" => Ok(1),
        "Z" => Ok(2),
        axis => Err(line.error(format!("Invalid axis ({axis})"))),
    }
}

fn constraint_kind(name: &str) -> ConstraintKind {
    match name {
        "LIMIT_ROTATION" => ConstraintKind::LimitRotation(LimitRotation::default()),
        "LIMIT_LOCATION" => ConstraintKind::LimitLocation,
        "LIMIT_SCALE" => ConstraintKind::LimitScale,
        "LIMIT_DISTANCE" => ConstraintKind::LimitDistance,
        other => ConstraintKind::Other(other.to_string()),
    }
}

/// The constraint called `name` on `bone`, added as a rotation limit when missing.
fn limit_named<'b>(bone: &'b mut Bone, name: &str) -> &'b mut Constraint {
    let index = match bone.constraints.iter().position(|c| c.name == name) {
        Some(index) => index,
        None => {
            bone.constraints
                .push(Constraint::limit_rotation(name, LimitRotation::default()));
            bone.constraints.len() - 1
        }
    };
    &mut bone.constraints[index]
}

fn existing_constraint<'b>(
    line: &ConfigLine,
    bone: &'b mut Bone,
    name: &str,
) -> Result<&'b mut Constraint, ConfigError> {
    let bone_name = bone.name.clone();
    bone.constraints
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| line.error(format!("{bone_name} has no constraint {name}")))
}

impl TryFrom<ConfigLines> for Armature {
    type Error = ConfigError;

    fn try_from(value: ConfigLines) -> Result<Self, Self::Error> {
        let mut name = String::new();
        let mut bones: Vec<ConfigLine> = Vec::new();
        let mut bone_lines: Vec<ConfigLine> = Vec::new();
        let mut properties: Vec<(String, f64)> = Vec::new();
        let mut layers: Option<[bool; LAYER_COUNT]> = None;
        let mut t_pose: Vec<(String, DQuat, usize)> = Vec::new();

        for line in value.into_lines() {
            match line.key.as_str() {
                "ARMATURE" => name = line.require_string(0)?,
                "BONE" => bones.push(line),
                "ROTATION_MODE" | "LOCK" | "LIMIT_ROTATION" | "CONSTRAINT" | "INFLUENCE"
                | "OWNER_SPACE" | "MUTE" => bone_lines.push(line),
                "PROPERTY" => properties.push((line.require_string(0)?, line.require_float(1)?)),
                "LAYERS" => {
                    let bits = line.require_string(0)?;
                    if bits.len() != LAYER_COUNT || bits.chars().any(|c| c != '0' && c != '1') {
                        return Err(line.error(format!(
                            "LAYERS expects a quoted string of {LAYER_COUNT} digits"
                        )));
                    }
                    let mut value = [false; LAYER_COUNT];
                    for (layer, bit) in bits.chars().enumerate() {
                        value[layer] = bit == '1';
                    }
                    layers = Some(value);
                }
                "T_POSE" => {
                    let [w, x, y, z] = line.require_floats::<4>(1)?;
                    t_pose.push((
                        line.require_string(0)?,
                        DQuat::from_xyzw(x, y, z, w).normalize(),
                        line.line,
                    ));
                }
                _ => return Err(line.error(format!("Unknown key ({})", line.key))),
            }
        }

        let mut builder = Armature::builder(name);

        for line in bones.iter() {
            let bone_name = line.require_string(0)?;
            let parent = line.require_string(1)?;
            let parent = (parent != "None").then_some(parent.as_str());
            let [hx, hy, hz] = line.require_floats::<3>(2)?;
            let [w, x, y, z] = line.require_floats::<4>(5)?;

            let rest = math::compose(
                DQuat::from_xyzw(x, y, z, w).normalize(),
                DVec3::new(hx, hy, hz),
            );
            builder
                .add_bone(&bone_name, parent, rest)
                .map_err(|err| line.error(err.to_string()))?;
        }

        for line in bone_lines.iter() {
            let bone_name = line.require_string(0)?;
            let bone = builder
                .bone_mut(&bone_name)
                .map_err(|err| line.error(err.to_string()))?;

            match line.key.as_str() {
                "ROTATION_MODE" => {
                    let mode = line.require_string(1)?;
                    bone.rotation_mode = mode
                        .parse::<RotationMode>()
                        .map_err(|_| line.error(format!("Invalid rotation mode ({mode})")))?;
                }
                "LOCK" => {
                    let axes = line.require_string(1)?;
                    bone.lock_rotation = AxisLocks::parse(&axes)
                        .ok_or_else(|| line.error(format!("Invalid lock axes ({axes})")))?;
                }
                "LIMIT_ROTATION" => {
                    let axis = axis_index(line, 1)?;
                    let min = line.require_float(2)?.to_radians();
                    let max = line.require_float(3)?.to_radians();
                    let name = line
                        .maybe_param::<String>(4)
                        .unwrap_or_else(|| DEFAULT_LIMIT_NAME.to_string());

                    let constraint = limit_named(bone, &name);
                    let ConstraintKind::LimitRotation(ref mut limit) = constraint.kind else {
                        return Err(line.error(format!("{name} is not a rotation limit")));
                    };
                    limit.axes[axis] = AxisLimit::new(min, max);
                }
                "CONSTRAINT" => {
                    let kind = line.require_string(1)?;
                    let name = line.maybe_param::<String>(2).unwrap_or_else(|| kind.clone());
                    bone.constraints
                        .push(Constraint::new(name, constraint_kind(&kind)));
                }
                "INFLUENCE" => {
                    let influence = line.require_float(1)?;
                    let name = line
                        .maybe_param::<String>(2)
                        .unwrap_or_else(|| DEFAULT_LIMIT_NAME.to_string());
                    existing_constraint(line, bone, &name)?.influence = influence;
                }
                "OWNER_SPACE" => {
                    let space = line.require_string(1)?;
                    let owner_space = space
                        .parse::<OwnerSpace>()
                        .map_err(|_| line.error(format!("Invalid owner space ({space})")))?;
                    let name = line
                        .maybe_param::<String>(2)
                        .unwrap_or_else(|| DEFAULT_LIMIT_NAME.to_string());
                    existing_constraint(line, bone, &name)?.owner_space = owner_space;
                }
                "MUTE" => {
                    let name = line
                        .maybe_param::<String>(1)
                        .unwrap_or_else(|| DEFAULT_LIMIT_NAME.to_string());
                    existing_constraint(line, bone, &name)?.mute = true;
                }
                _ => {}
            }
        }

        let mut armature = builder.build();
        armature.properties.extend(properties);
        if let Some(layers) = layers {
            armature.layers = layers;
        }

        if !t_pose.is_empty() {
            let mut stored = vec![DQuat::IDENTITY; armature.len()];
            for (bone, rotation, line) in t_pose {
                let index = armature.find(&bone).ok_or_else(|| ConfigError::Parse {
                    line,
                    message: format!("Unknown bone ({bone})"),
                })?;
                stored[index] = rotation;
            }
            armature.stored_t_pose = Some(stored);
        }

        Ok(armature)
    }
}
