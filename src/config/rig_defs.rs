use crate::tpose::TPoseChoice;

use super::{ConfigError, ConfigLines};

/// How a known rig's bones map onto canonical roles.
#[derive(Debug, Default, PartialEq)]
pub struct RigDef {
    pub name: String,
    /// Target bone to role. A `None` role keeps the bone out of the mapping.
    pub bones: Vec<(String, Option<String>)>,
    /// Target bone to the bone it should be parented to while retargeting.
    pub parents: Vec<(String, Option<String>)>,
    /// A bone that has to be mapped for the rig to be usable.
    pub root: Option<String>,
    pub t_pose: Option<TPoseChoice>,
}

fn optional(name: String) -> Option<String> {
    (name != "None").then_some(name)
}

impl TryFrom<ConfigLines> for RigDef {
    type Error = ConfigError;

    fn try_from(value: ConfigLines) -> Result<Self, Self::Error> {
        let mut rig_def = RigDef::default();

        for line in value.into_lines() {
            match line.key.as_str() {
                "NAME" => rig_def.name = line.require_string(0)?,
                "BONE" => {
                    let bone = line.require_string(0)?;
                    let role = optional(line.require_string(1)?);
                    rig_def.bones.push((bone, role));
                }
                "PARENT" => {
                    let bone = line.require_string(0)?;
                    let parent = optional(line.require_string(1)?);
                    rig_def.parents.push((bone, parent));
                }
                "ROOT" => rig_def.root = Some(line.require_string(0)?),
                "T_POSE" => {
                    let Ok(choice) = line.require_string(0)?.parse::<TPoseChoice>();
                    rig_def.t_pose = Some(choice);
                }
                _ => return Err(line.error(format!("Unknown key ({})", line.key))),
            }
        }

        Ok(rig_def)
    }
}
