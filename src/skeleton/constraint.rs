use glam::DMat4;

use crate::math::{self, Euler, RotationOrder};

use super::{AxisLocks, Bone, RotationMode};

/// Constraints with an influence at or below this are ignored when clamping.
const INFLUENCE_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerSpace {
    World,
    Pose,
    LocalWithParent,
    #[default]
    Local,
}

/// Allowed range (radians) for one rotation axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisLimit {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
}

impl AxisLimit {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            min,
            max,
        }
    }

    /// `min(max, max(min, angle))`. A reversed range pins the angle to `max`.
    #[inline]
    pub fn clamp(&self, angle: f64) -> f64 {
        self.max.min(self.min.max(angle))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LimitRotation {
    pub axes: [AxisLimit; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintKind {
    LimitRotation(LimitRotation),
    LimitLocation,
    LimitScale,
    LimitDistance,
    Other(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub owner_space: OwnerSpace,
    pub mute: bool,
    pub influence: f64,
}

impl Constraint {
    pub fn limit_rotation(name: impl Into<String>, limit: LimitRotation) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::LimitRotation(limit),
            owner_space: OwnerSpace::Local,
            mute: false,
            influence: 1.0,
        }
    }

    pub fn new(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
            owner_space: OwnerSpace::Local,
            mute: false,
            influence: 1.0,
        }
    }

    /// Any of the `Limit*` constraint types.
    pub fn is_limit(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::LimitRotation(_)
                | ConstraintKind::LimitLocation
                | ConstraintKind::LimitScale
                | ConstraintKind::LimitDistance
        )
    }

    /// The rotation limit this constraint enforces during retargeting, if it is active.
    fn active_rotation_limit(&self) -> Option<&LimitRotation> {
        match self.kind {
            ConstraintKind::LimitRotation(ref limit)
                if self.owner_space == OwnerSpace::Local
                    && !self.mute
                    && self.influence > INFLUENCE_THRESHOLD =>
            {
                Some(limit)
            }
            _ => None,
        }
    }
}

/// Derive the euler order used to zero locked axes, and the locked axes in the order they are
/// zeroed.
pub fn derive_order(locks: AxisLocks, mode: RotationMode) -> (RotationOrder, Vec<usize>) {
    let mut axes = Vec::with_capacity(3);
    let mut order = RotationOrder::XYZ;

    if locks.contains(AxisLocks::Y) {
        axes.push(1);
        order = RotationOrder::YZX;
        if locks.contains(AxisLocks::X) {
            order = RotationOrder::YXZ;
            axes.push(0);
        }
        if locks.contains(AxisLocks::Z) {
            axes.push(2);
        }
    } else if locks.contains(AxisLocks::Z) {
        axes.push(2);
        order = RotationOrder::ZYX;
        if locks.contains(AxisLocks::X) {
            order = RotationOrder::ZXY;
            axes.push(0);
        }
    } else if locks.contains(AxisLocks::X) {
        axes.push(0);
        order = RotationOrder::XYZ;
    }

    if let RotationMode::Euler(own) = mode {
        order = own;
    }

    (order, axes)
}

/// Lock and limit handling for one target bone.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintPolicy {
    pub order: RotationOrder,
    pub locks: Vec<usize>,
    pub use_limits: bool,
}

impl ConstraintPolicy {
    pub fn for_bone(bone: &Bone, use_limits: bool) -> Self {
        let (order, locks) = derive_order(bone.lock_rotation, bone.rotation_mode);
        Self {
            order,
            locks,
            use_limits,
        }
    }

    /// Project a local bone matrix onto the bone's locks and rotation limits. The translation
    /// column passes through untouched.
    pub fn correct_for_locks(&self, matrix: DMat4, constraints: &[Constraint]) -> DMat4 {
        let head = math::translation(&matrix);
        let mut rotation = matrix;

        if !self.locks.is_empty() {
            let mut euler = Euler::from_mat4(&rotation, self.order);
            for &axis in self.locks.iter() {
                euler.set(axis, 0.0);
            }
            rotation = euler.to_mat4();
        }

        if !self.use_limits {
            return math::with_translation(rotation, head);
        }

        for limit in constraints.iter().filter_map(Constraint::active_rotation_limit) {
            let mut euler = Euler::from_mat4(&rotation, self.order);
            for (axis, axis_limit) in limit.axes.iter().enumerate() {
                if axis_limit.enabled {
                    euler.set(axis, axis_limit.clamp(euler.get(axis)));
                }
            }
            rotation = euler.to_mat4();
        }

        math::with_translation(rotation, head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DQuat, DVec3};

    fn order_of(locks: AxisLocks) -> (RotationOrder, Vec<usize>) {
        derive_order(locks, RotationMode::Quaternion)
    }

    fn limit_x(min: f64, max: f64) -> LimitRotation {
        LimitRotation {
            axes: [AxisLimit::new(min, max), AxisLimit::default(), AxisLimit::default()],
        }
    }

    #[test]
    fn order_derivation_matches_lock_combinations() {
        assert_eq!(order_of(AxisLocks::empty()), (RotationOrder::XYZ, vec![]));
        assert_eq!(order_of(AxisLocks::X), (RotationOrder::XYZ, vec![0]));
        assert_eq!(order_of(AxisLocks::Y), (RotationOrder::YZX, vec![1]));
        assert_eq!(order_of(AxisLocks::Z), (RotationOrder::ZYX, vec![2]));
        assert_eq!(
            order_of(AxisLocks::X | AxisLocks::Y),
            (RotationOrder::YXZ, vec![1, 0])
        );
        assert_eq!(
            order_of(AxisLocks::Y | AxisLocks::Z),
            (RotationOrder::YZX, vec![1, 2])
        );
        assert_eq!(
            order_of(AxisLocks::X | AxisLocks::Z),
            (RotationOrder::ZXY, vec![2, 0])
        );
        assert_eq!(
            order_of(AxisLocks::all()),
            (RotationOrder::YXZ, vec![1, 0, 2])
        );
    }

    #[test]
    fn euler_bones_keep_their_own_order() {
        let (order, locks) = derive_order(AxisLocks::Y, RotationMode::Euler(RotationOrder::ZXY));
        assert_eq!(order, RotationOrder::ZXY);
        assert_eq!(locks, vec![1]);

        let (order, _) = derive_order(AxisLocks::Y, RotationMode::AxisAngle);
        assert_eq!(order, RotationOrder::YZX);
    }

    #[test]
    fn locked_y_is_zeroed() {
        let policy = ConstraintPolicy {
            order: RotationOrder::YZX,
            locks: vec![1],
            use_limits: true,
        };
        let rotations = [
            DQuat::from_rotation_y(0.8) * DQuat::from_rotation_x(0.3),
            DQuat::from_euler(glam::EulerRot::XYZ, 1.2, -0.7, 0.4),
            DQuat::from_rotation_z(-2.0) * DQuat::from_rotation_y(-1.1),
        ];

        for rotation in rotations {
            let matrix = math::compose(rotation, DVec3::new(0.1, 0.2, 0.3));
            let corrected = policy.correct_for_locks(matrix, &[]);
            let euler = Euler::from_mat4(&corrected, RotationOrder::YZX);
            assert!(euler.get(1).abs() < 1e-9, "y = {}", euler.get(1));
            assert_eq!(math::translation(&corrected), DVec3::new(0.1, 0.2, 0.3));
        }
    }

    #[test]
    fn rotation_beyond_limit_is_clamped_to_boundary() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![],
            use_limits: true,
        };
        let constraints = [Constraint::limit_rotation("limit", limit_x(-0.5, 0.5))];
        let matrix = math::compose(DQuat::from_rotation_x(1.2), DVec3::new(1.0, 2.0, 3.0));

        let corrected = policy.correct_for_locks(matrix, &constraints);
        let euler = Euler::from_mat4(&corrected, RotationOrder::XYZ);
        assert!((euler.get(0) - 0.5).abs() < 1e-9);
        assert_eq!(math::translation(&corrected), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rotation_within_limit_is_unchanged() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![],
            use_limits: true,
        };
        let constraints = [Constraint::limit_rotation("limit", limit_x(-0.5, 0.5))];
        let matrix = math::compose(DQuat::from_rotation_x(0.25), DVec3::new(-4.0, 0.5, 9.0));

        let corrected = policy.correct_for_locks(matrix, &constraints);
        assert!(corrected.abs_diff_eq(matrix, 1e-12));
        assert_eq!(corrected.w_axis, matrix.w_axis);
    }

    #[test]
    fn large_turn_about_free_axis_passes_x_lock() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![0],
            use_limits: false,
        };
        let matrix = math::compose(DQuat::from_rotation_y(2.84), DVec3::new(0.0, 1.0, 0.0));

        let corrected = policy.correct_for_locks(matrix, &[]);
        assert!(corrected.abs_diff_eq(matrix, 1e-9));
    }

    #[test]
    fn large_turn_about_free_axis_passes_x_limit() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![],
            use_limits: true,
        };
        let constraints = [Constraint::limit_rotation("limit", limit_x(-0.1, 0.1))];
        let matrix = math::compose(DQuat::from_rotation_y(2.84), DVec3::ZERO);

        let corrected = policy.correct_for_locks(matrix, &constraints);
        assert!(corrected.abs_diff_eq(matrix, 1e-9));
    }

    #[test]
    fn limits_are_ignored_when_disabled() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![],
            use_limits: false,
        };
        let constraints = [Constraint::limit_rotation("limit", limit_x(-0.5, 0.5))];
        let matrix = math::compose(DQuat::from_rotation_x(1.2), DVec3::ZERO);

        let corrected = policy.correct_for_locks(matrix, &constraints);
        assert!(corrected.abs_diff_eq(matrix, 1e-12));
    }

    #[test]
    fn influence_at_threshold_does_not_apply() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![],
            use_limits: true,
        };
        let matrix = math::compose(DQuat::from_rotation_x(1.2), DVec3::ZERO);

        let mut constraint = Constraint::limit_rotation("limit", limit_x(-0.5, 0.5));
        constraint.influence = 0.5;
        let corrected = policy.correct_for_locks(matrix, &[constraint.clone()]);
        assert!(corrected.abs_diff_eq(matrix, 1e-12));

        constraint.influence = 0.51;
        let corrected = policy.correct_for_locks(matrix, &[constraint]);
        assert!((Euler::from_mat4(&corrected, RotationOrder::XYZ).get(0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn muted_and_non_local_constraints_are_skipped() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![],
            use_limits: true,
        };
        let matrix = math::compose(DQuat::from_rotation_x(1.2), DVec3::ZERO);

        let mut muted = Constraint::limit_rotation("muted", limit_x(-0.5, 0.5));
        muted.mute = true;
        let mut world = Constraint::limit_rotation("world", limit_x(-0.5, 0.5));
        world.owner_space = OwnerSpace::World;

        let corrected = policy.correct_for_locks(matrix, &[muted, world]);
        assert!(corrected.abs_diff_eq(matrix, 1e-12));
    }

    #[test]
    fn constraints_apply_in_declared_order() {
        let policy = ConstraintPolicy {
            order: RotationOrder::XYZ,
            locks: vec![],
            use_limits: true,
        };
        let matrix = math::compose(DQuat::from_rotation_x(1.2), DVec3::ZERO);
        let constraints = [
            Constraint::limit_rotation("first", limit_x(-0.5, 0.5)),
            Constraint::limit_rotation("second", limit_x(0.7, 0.9)),
        ];

        let corrected = policy.correct_for_locks(matrix, &constraints);
        let euler = Euler::from_mat4(&corrected, RotationOrder::XYZ);
        assert!((euler.get(0) - 0.7).abs() < 1e-9);
    }
}
