use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use tracing::{debug, warn};

use crate::{
    config::RigDef,
    skeleton::{Armature, BoneIndex, RoleTable},
};

use super::MappingError;

/// Target to source bone correspondence, with optional parent hints supplied by a rig
/// definition.
#[derive(Clone, Debug, Default)]
pub struct Mapping {
    /// `(target, source)` in declaration order. Target names are unique.
    entries: Vec<(String, String)>,
    /// Target bone to the bone that should be treated as its parent. `None` makes the bone a
    /// root even when the armature gives it a parent.
    parent_hints: HashMap<String, Option<String>>,
    required_root: Option<String>,
}

/// A mapped pair that exists in both armatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitSpec {
    pub target: BoneIndex,
    pub source: BoneIndex,
    /// Index of the nearest mapped ancestor in the resolved list.
    pub parent: Option<usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every bone of `armature` onto the bone with the same name.
    pub fn identity(armature: &Armature) -> Self {
        let mut mapping = Self::new();
        for bone in armature.bones() {
            mapping.push(&bone.name, &bone.name);
        }
        mapping
    }

    pub fn from_rig_def(def: &RigDef) -> Self {
        let mut mapping = Self::new();
        for (target, source) in def.bones.iter() {
            if let Some(source) = source {
                mapping.push(target, source);
            }
        }
        for (target, parent) in def.parents.iter() {
            mapping.set_parent_hint(target, parent.as_deref());
        }
        mapping.required_root = def.root.clone();
        mapping
    }

    /// Add a pair. A target that is already mapped keeps its first source.
    pub fn push(&mut self, target: &str, source: &str) -> bool {
        if self.entries.iter().any(|(t, _)| t == target) {
            warn!("Duplicate mapping for {target}, ignoring {source}");
            return false;
        }
        self.entries.push((target.to_string(), source.to_string()));
        true
    }

    pub fn set_parent_hint(&mut self, target: &str, parent: Option<&str>) {
        self.parent_hints
            .insert(target.to_string(), parent.map(str::to_string));
    }

    pub fn set_required_root(&mut self, root: Option<&str>) {
        self.required_root = root.map(str::to_string);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Roles of the target bones, named after the source bones they are mapped to.
    pub fn target_roles(&self, target: &Armature) -> RoleTable {
        RoleTable::from_pairs(target, self.entries())
    }

    /// Resolve names against both armatures and link every pair to its nearest mapped
    /// ancestor. The result is ordered so that parents precede their children.
    pub fn resolve(
        &self,
        source: &Armature,
        target: &Armature,
    ) -> Result<Vec<UnitSpec>, MappingError> {
        let mut pairs: Vec<(BoneIndex, BoneIndex)> = Vec::with_capacity(self.entries.len());
        for (target_name, source_name) in self.entries() {
            match (target.find(target_name), source.find(source_name)) {
                (Some(t), Some(s)) => pairs.push((t, s)),
                _ => debug!("Dropping pair {target_name} <- {source_name}"),
            }
        }

        if pairs.is_empty() {
            return Err(MappingError::NoValidPairs);
        }

        if let Some(ref root) = self.required_root {
            let mapped = target
                .find(root)
                .is_some_and(|index| pairs.iter().any(|&(t, _)| t == index));
            if !mapped {
                return Err(MappingError::RootUnmapped(root.clone()));
            }
        }

        let by_target: HashMap<BoneIndex, usize> = pairs
            .iter()
            .enumerate()
            .map(|(unit, &(t, _))| (t, unit))
            .collect();

        let mut parents = Vec::with_capacity(pairs.len());
        for &(t, _) in pairs.iter() {
            parents.push(self.mapped_ancestor(target, t, &by_target)?);
        }

        let depths = unit_depths(target, &pairs, &parents)?;

        let mut order: Vec<usize> = (0..pairs.len()).collect();
        order.sort_by_key(|&unit| depths[unit]);

        let mut position = vec![0; pairs.len()];
        for (new, &old) in order.iter().enumerate() {
            position[old] = new;
        }

        Ok(order
            .iter()
            .map(|&old| UnitSpec {
                target: pairs[old].0,
                source: pairs[old].1,
                parent: parents[old].map(|p| position[p]),
            })
            .collect())
    }

    /// The bone after `name` when walking up: its hint if it has one, else its real parent.
    fn next_ancestor<'a>(&'a self, target: &'a Armature, name: &str) -> Option<&'a str> {
        match self.parent_hints.get(name) {
            Some(hint) => hint.as_deref(),
            None => target
                .find(name)
                .and_then(|index| target.bone(index).parent)
                .map(|parent| target.bone(parent).name.as_str()),
        }
    }

    fn mapped_ancestor(
        &self,
        target: &Armature,
        bone: BoneIndex,
        by_target: &HashMap<BoneIndex, usize>,
    ) -> Result<Option<usize>, MappingError> {
        let name = target.bone(bone).name.as_str();
        let mut visited = HashSet::new();
        visited.insert(name);

        let mut candidate = self.next_ancestor(target, name);
        while let Some(current) = candidate {
            if !visited.insert(current) {
                return Err(MappingError::Cycle(name.to_string()));
            }
            if let Some(unit) = target.find(current).and_then(|i| by_target.get(&i)) {
                return Ok(Some(*unit));
            }
            debug!("Skipping {current}");
            candidate = self.next_ancestor(target, current);
        }

        Ok(None)
    }
}

/// Depth of every unit in the unit forest. Hints can link mapped bones into a loop, which is
/// reported as a cycle.
fn unit_depths(
    target: &Armature,
    pairs: &[(BoneIndex, BoneIndex)],
    parents: &[Option<usize>],
) -> Result<Vec<usize>, MappingError> {
    let mut depths = Vec::with_capacity(parents.len());
    for unit in 0..parents.len() {
        let mut depth = 0;
        let mut current = parents[unit];
        while let Some(parent) = current {
            depth += 1;
            if depth > parents.len() {
                let name = &target.bone(pairs[unit].0).name;
                return Err(MappingError::Cycle(name.clone()));
            }
            current = parents[parent];
        }
        depths.push(depth);
    }
    Ok(depths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DMat4;

    fn armature(name: &str, bones: &[(&str, Option<&str>)]) -> Armature {
        let mut builder = Armature::builder(name);
        for &(bone, parent) in bones {
            builder.add_bone(bone, parent, DMat4::IDENTITY).unwrap();
        }
        builder.build()
    }

    fn source() -> Armature {
        armature(
            "source",
            &[
                ("Hips", None),
                ("Spine", Some("Hips")),
                ("Neck", Some("Spine")),
                ("LeftUpLeg", Some("Hips")),
            ],
        )
    }

    fn target() -> Armature {
        armature(
            "target",
            &[
                ("root", None),
                ("hips", Some("root")),
                ("spine", Some("hips")),
                ("chest", Some("spine")),
                ("neck", Some("chest")),
                ("thigh.L", Some("hips")),
            ],
        )
    }

    fn names(specs: &[UnitSpec], target: &Armature) -> Vec<(String, Option<String>)> {
        specs
            .iter()
            .map(|spec| {
                (
                    target.bone(spec.target).name.clone(),
                    spec.parent
                        .map(|p| target.bone(specs[p].target).name.clone()),
                )
            })
            .collect()
    }

    #[test]
    fn duplicate_targets_keep_first_pair() {
        let mut mapping = Mapping::new();
        assert!(mapping.push("hips", "Hips"));
        assert!(!mapping.push("hips", "Spine"));
        assert_eq!(mapping.entries().collect::<Vec<_>>(), vec![("hips", "Hips")]);
    }

    #[test]
    fn unmapped_ancestors_are_skipped() {
        let (source, target) = (source(), target());
        let mut mapping = Mapping::new();
        mapping.push("neck", "Neck");
        mapping.push("thigh.L", "LeftUpLeg");
        mapping.push("hips", "Hips");
        mapping.push("missing", "Hips");
        mapping.push("spine", "Missing");

        let specs = mapping.resolve(&source, &target).unwrap();
        assert_eq!(
            names(&specs, &target),
            vec![
                ("hips".to_string(), None),
                ("neck".to_string(), Some("hips".to_string())),
                ("thigh.L".to_string(), Some("hips".to_string())),
            ]
        );
    }

    #[test]
    fn parent_hints_take_precedence() {
        let (source, target) = (source(), target());
        let mut mapping = Mapping::new();
        mapping.push("hips", "Hips");
        mapping.push("spine", "Spine");
        mapping.push("neck", "Neck");
        mapping.set_parent_hint("neck", Some("hips"));
        mapping.set_parent_hint("spine", None);

        let specs = mapping.resolve(&source, &target).unwrap();
        assert_eq!(
            names(&specs, &target),
            vec![
                ("hips".to_string(), None),
                ("spine".to_string(), None),
                ("neck".to_string(), Some("hips".to_string())),
            ]
        );
    }

    #[test]
    fn no_valid_pairs() {
        let mut mapping = Mapping::new();
        mapping.push("hips", "Pelvis");
        assert_eq!(
            mapping.resolve(&source(), &target()),
            Err(MappingError::NoValidPairs)
        );
        assert_eq!(
            Mapping::new().resolve(&source(), &target()),
            Err(MappingError::NoValidPairs)
        );
    }

    #[test]
    fn required_root_must_be_mapped() {
        let mut mapping = Mapping::new();
        mapping.push("spine", "Spine");
        mapping.set_required_root(Some("hips"));
        assert_eq!(
            mapping.resolve(&source(), &target()),
            Err(MappingError::RootUnmapped("hips".into()))
        );

        mapping.push("hips", "Hips");
        assert!(mapping.resolve(&source(), &target()).is_ok());
    }

    #[test]
    fn hint_cycles_are_errors() {
        let (source, target) = (source(), target());
        let mut mapping = Mapping::new();
        mapping.push("spine", "Spine");
        mapping.push("neck", "Neck");
        mapping.set_parent_hint("spine", Some("neck"));
        mapping.set_parent_hint("neck", Some("spine"));
        assert!(matches!(
            mapping.resolve(&source, &target),
            Err(MappingError::Cycle(_))
        ));

        let mut mapping = Mapping::new();
        mapping.push("hips", "Hips");
        mapping.set_parent_hint("hips", Some("chest"));
        mapping.set_parent_hint("chest", Some("hips"));
        assert!(matches!(
            mapping.resolve(&source, &target),
            Err(MappingError::Cycle(_))
        ));
    }

    #[test]
    fn identity_maps_every_bone() {
        let target = target();
        let mapping = Mapping::identity(&target);
        assert_eq!(mapping.len(), target.len());
        let specs = mapping.resolve(&target, &target).unwrap();
        assert!(specs.iter().all(|spec| spec.source == spec.target));
        assert_eq!(specs[0].parent, None);
    }

    #[test]
    fn target_roles_follow_source_names() {
        let target = target();
        let mut mapping = Mapping::new();
        mapping.push("thigh.L", "LeftUpLeg");
        let roles = mapping.target_roles(&target);
        assert_eq!(roles.bone("LeftUpLeg"), target.find("thigh.L"));
    }
}
