use std::fmt::Write;

use glam::DQuat;

use crate::tpose::TPoseTable;

use super::{ConfigError, ConfigLines};

impl TryFrom<ConfigLines> for TPoseTable {
    type Error = ConfigError;

    fn try_from(value: ConfigLines) -> Result<Self, Self::Error> {
        let mut table = TPoseTable::default();

        for line in value.into_lines() {
            match line.key.as_str() {
                "NAME" => table.name = line.require_string(0)?,
                "BONE" => {
                    let role = line.require_string(0)?;
                    let [w, x, y, z] = line.require_floats::<4>(1)?;
                    let rotation = DQuat::from_xyzw(x, y, z, w);
                    if !rotation.length().is_normal() {
                        return Err(line.error(format!("Rotation of {role} has zero length")));
                    }
                    table.bones.push((role, rotation.normalize()));
                }
                _ => return Err(line.error(format!("Unknown key ({})", line.key))),
            }
        }

        Ok(table)
    }
}

/// Serialize a table in the format [TPoseTable::try_from] reads.
pub fn write_t_pose(table: &TPoseTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NAME \"{}\"", table.name);
    for (role, q) in table.bones.iter() {
        let _ = writeln!(out, "BONE \"{role}\" {} {} {} {}", q.w, q.x, q.y, q.z);
    }
    out
}
