use ahash::{HashMap, HashMapExt};

use super::{Armature, BoneIndex};

/// Side table from bones to canonical role names ("upper_arm.L", "thigh.R", ...).
#[derive(Clone, Debug, Default)]
pub struct RoleTable {
    by_bone: HashMap<BoneIndex, String>,
    by_role: HashMap<String, BoneIndex>,
}

impl RoleTable {
    /// Every bone plays the role of its own name. Used for armatures that were already renamed
    /// to canonical names.
    pub fn identity(armature: &Armature) -> Self {
        Self::from_pairs(
            armature,
            armature
                .bones()
                .iter()
                .map(|bone| (bone.name.as_str(), bone.name.as_str())),
        )
    }

    /// Build from `(bone name, role)` pairs. Pairs naming unknown bones are ignored and the
    /// first bone claiming a role keeps it.
    pub fn from_pairs<'a>(
        armature: &Armature,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut table = Self {
            by_bone: HashMap::new(),
            by_role: HashMap::new(),
        };

        for (bone, role) in pairs {
            let Some(index) = armature.find(bone) else {
                continue;
            };
            table.by_bone.entry(index).or_insert_with(|| role.to_string());
            table.by_role.entry(role.to_string()).or_insert(index);
        }

        table
    }

    pub fn role(&self, bone: BoneIndex) -> Option<&str> {
        self.by_bone.get(&bone).map(String::as_str)
    }

    pub fn bone(&self, role: &str) -> Option<BoneIndex> {
        self.by_role.get(role).copied()
    }

    pub fn len(&self) -> usize {
        self.by_bone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_bone.is_empty()
    }
}
