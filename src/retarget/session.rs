use tracing::info;

use crate::{
    animation::{Frame, KeyframeSink},
    skeleton::{Armature, RoleTable},
    tpose::{self, TPoseLibrary},
};

use super::{
    BoneRetargetUnit, Mapping, RetargetError, RetargetOptions, SourceRig, UnitLink, UnitSpec,
    action_name, prepare::TargetSnapshot,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Prepared,
    InTPose,
    Retargeting,
    Done,
}

/// Outcome of a successful session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetargetReport {
    pub frames: usize,
    pub units: usize,
    pub action_name: String,
}

/// One retarget of a source onto a target. The target is borrowed exclusively for the
/// session; everything the session changes on it is put back when [RetargetSession::run]
/// returns, whether it succeeded or not.
pub struct RetargetSession<'a, S: SourceRig + ?Sized> {
    source: &'a S,
    target: &'a mut Armature,
    mapping: &'a Mapping,
    options: RetargetOptions,
    library: Option<&'a mut TPoseLibrary>,
    visit_order: Option<Vec<String>>,
    units: Vec<BoneRetargetUnit>,
    state: SessionState,
}

impl<'a, S: SourceRig + ?Sized> RetargetSession<'a, S> {
    pub fn new(
        source: &'a S,
        target: &'a mut Armature,
        mapping: &'a Mapping,
        options: RetargetOptions,
    ) -> Self {
        Self {
            source,
            target,
            mapping,
            options,
            library: None,
            visit_order: None,
            units: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Where named T-poses are loaded from.
    pub fn with_t_pose_library(mut self, library: &'a mut TPoseLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Visit units in this order of target bone names instead of the resolved order. Every
    /// mapped bone must appear once, after its retargeting parent.
    pub fn with_visit_order(mut self, order: Vec<String>) -> Self {
        self.visit_order = Some(order);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn units(&self) -> &[BoneRetargetUnit] {
        &self.units
    }

    pub fn run<K: KeyframeSink + ?Sized>(
        &mut self,
        sink: &mut K,
    ) -> Result<RetargetReport, RetargetError> {
        if self.state != SessionState::Idle {
            return Err(RetargetError::Configuration(
                "Retarget session already ran".to_string(),
            ));
        }

        let source = self.source;
        let source_armature = source.armature();
        let frames = source.frames();
        if frames.is_empty() {
            return Err(RetargetError::EmptyAnimation);
        }
        if source_armature.is_empty() {
            return Err(RetargetError::Configuration(format!(
                "Source armature {} has no bones",
                source_armature.name
            )));
        }
        if self.target.is_empty() {
            return Err(RetargetError::Configuration(format!(
                "Target armature {} has no bones",
                self.target.name
            )));
        }
        if self.options.batch_size == 0 {
            return Err(RetargetError::Configuration(
                "Batch size must be at least 1".to_string(),
            ));
        }

        let specs = self.mapping.resolve(source_armature, self.target)?;
        let order = self.visit_order(&specs)?;

        info!("Retarget {} --> {}", source_armature.name, self.target.name);

        let mapped: Vec<_> = specs.iter().map(|spec| spec.target).collect();
        let snapshot = TargetSnapshot::prepare(self.target, &mapped, &self.options);
        self.state = SessionState::Prepared;

        let result = self.retarget(&specs, &order, &frames, sink);

        snapshot.restore(self.target);
        self.state = SessionState::Done;
        result?;

        sink.finish();

        let report = RetargetReport {
            frames: frames.len(),
            units: self.units.len(),
            action_name: action_name(&self.target.name, &source_armature.name),
        };
        info!(
            "Retargeted {} --> {}: {} frames, {} bones",
            source_armature.name, self.target.name, report.frames, report.units
        );

        Ok(report)
    }

    /// Indices into `specs` in visiting order.
    fn visit_order(&self, specs: &[UnitSpec]) -> Result<Vec<usize>, RetargetError> {
        let Some(ref names) = self.visit_order else {
            return Ok((0..specs.len()).collect());
        };

        if names.len() != specs.len() {
            return Err(RetargetError::Configuration(format!(
                "Visit order names {} bones, {} are mapped",
                names.len(),
                specs.len()
            )));
        }

        let mut visited = vec![false; specs.len()];
        let mut order = Vec::with_capacity(specs.len());
        for name in names {
            let unit = self
                .target
                .find(name)
                .and_then(|bone| specs.iter().position(|spec| spec.target == bone))
                .ok_or_else(|| {
                    RetargetError::Configuration(format!("{name} in visit order is not mapped"))
                })?;

            if visited[unit] {
                return Err(RetargetError::Configuration(format!(
                    "{name} appears twice in visit order"
                )));
            }
            if specs[unit].parent.is_some_and(|parent| !visited[parent]) {
                return Err(RetargetError::Configuration(format!(
                    "{name} is visited before its parent"
                )));
            }

            visited[unit] = true;
            order.push(unit);
        }

        Ok(order)
    }

    fn retarget<K: KeyframeSink + ?Sized>(
        &mut self,
        specs: &[UnitSpec],
        order: &[usize],
        frames: &[Frame],
        sink: &mut K,
    ) -> Result<(), RetargetError> {
        self.units = specs
            .iter()
            .map(|spec| {
                let parent = spec.parent.map(|unit| (unit, specs[unit].target));
                BoneRetargetUnit::new(
                    spec.source,
                    spec.target,
                    parent,
                    self.target,
                    self.options.use_limits,
                )
            })
            .collect();

        self.put_in_t_poses()?;
        self.state = SessionState::InTPose;

        self.state = SessionState::Retargeting;
        let total = frames.len();
        for (batch, chunk) in frames.chunks(self.options.batch_size).enumerate() {
            let done = batch * self.options.batch_size;
            info!("Retargeting frame {} ({}/{})", chunk[0], done, total);

            for &frame in chunk {
                for &index in order {
                    let parent_world = match self.units[index].link {
                        UnitLink::Root => None,
                        UnitLink::Child(parent) => Some(self.units[parent].world_matrix()),
                    };

                    let unit = &mut self.units[index];
                    let source_world = self.source.world_matrix(unit.source, frame)?;
                    let bone = self.target.bone(unit.target);
                    unit.retarget(frame, source_world, parent_world.as_ref(), bone, sink)?;
                }
            }
        }

        Ok(())
    }

    /// Pose both armatures in T-pose and align every unit. The source is posed on a copy.
    fn put_in_t_poses(&mut self) -> Result<(), RetargetError> {
        let mut source_armature = self.source.armature().clone();
        let source_roles = RoleTable::from_pairs(
            &source_armature,
            source_armature
                .bones()
                .iter()
                .enumerate()
                .filter_map(|(index, bone)| Some((bone.name.as_str(), self.source.role(index)?))),
        );
        let target_roles = self.mapping.target_roles(self.target);

        tpose::put_in_t_pose(
            &mut source_armature,
            &source_roles,
            &self.options.source_t_pose,
            self.library.as_deref_mut(),
        )?;
        tpose::put_in_t_pose(
            self.target,
            &target_roles,
            &self.options.target_t_pose,
            self.library.as_deref_mut(),
        )?;

        let source_worlds = source_armature.world_matrices(&source_armature.pose);
        let target_worlds = self.target.world_matrices(&self.target.pose);
        for unit in self.units.iter_mut() {
            unit.align(&source_worlds[unit.source], &target_worlds[unit.target]);
        }

        Ok(())
    }
}
