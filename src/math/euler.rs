use std::f64::consts::PI;

use glam::{DMat4, DQuat, DVec3, EulerRot};

/// Axis sequence used when converting between matrices and euler angles.
///
/// `XYZ` rotates about X first, then Y, then Z (all about the fixed parent axes), so the
/// composed matrix is `Rz * Ry * Rx`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum RotationOrder {
    #[default]
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

impl RotationOrder {
    /// Axis indices (0 = X, 1 = Y, 2 = Z) in the order they are applied.
    pub fn axes(self) -> [usize; 3] {
        match self {
            RotationOrder::XYZ => [0, 1, 2],
            RotationOrder::XZY => [0, 2, 1],
            RotationOrder::YXZ => [1, 0, 2],
            RotationOrder::YZX => [1, 2, 0],
            RotationOrder::ZXY => [2, 0, 1],
            RotationOrder::ZYX => [2, 1, 0],
        }
    }

    /// The equivalent glam intrinsic sequence: applying X, Y, Z about fixed axes is the same
    /// as applying Z, Y, X about the moving ones.
    fn intrinsic(self) -> (EulerRot, [usize; 3]) {
        let [a, b, c] = self.axes();
        let rot = match self {
            RotationOrder::XYZ => EulerRot::ZYX,
            RotationOrder::XZY => EulerRot::YZX,
            RotationOrder::YXZ => EulerRot::ZXY,
            RotationOrder::YZX => EulerRot::XZY,
            RotationOrder::ZXY => EulerRot::YXZ,
            RotationOrder::ZYX => EulerRot::XYZ,
        };
        (rot, [c, b, a])
    }
}

/// Euler angles in radians, stored per axis (`angles.x` is always the X angle) together with
/// the order they are applied in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Euler {
    pub angles: DVec3,
    pub order: RotationOrder,
}

impl Euler {
    pub fn new(angles: DVec3, order: RotationOrder) -> Self {
        Self { angles, order }
    }

    /// Of the two angle triples that produce `rotation`, pick the one with the smallest sum of
    /// absolute angles. The middle angle may exceed a quarter turn.
    pub fn from_quat(rotation: DQuat, order: RotationOrder) -> Self {
        let (rot, axes) = order.intrinsic();
        let (a, b, c) = rotation.normalize().to_euler(rot);

        // R1(a + PI) * R2(PI - b) * R3(c + PI) is the same rotation.
        let flipped = (a - PI.copysign(a), PI.copysign(b) - b, c - PI.copysign(c));
        let (a, b, c) = if flipped.0.abs() + flipped.1.abs() + flipped.2.abs()
            < a.abs() + b.abs() + c.abs()
        {
            flipped
        } else {
            (a, b, c)
        };

        let mut angles = DVec3::ZERO;
        angles[axes[0]] = a;
        angles[axes[1]] = b;
        angles[axes[2]] = c;

        Self { angles, order }
    }

    /// Decompose the rotation part of `matrix`. Translation is ignored.
    pub fn from_mat4(matrix: &DMat4, order: RotationOrder) -> Self {
        Self::from_quat(DQuat::from_mat4(matrix), order)
    }

    pub fn to_quat(&self) -> DQuat {
        let (rot, axes) = self.order.intrinsic();
        DQuat::from_euler(
            rot,
            self.angles[axes[0]],
            self.angles[axes[1]],
            self.angles[axes[2]],
        )
    }

    /// Rotation-only matrix, translation is zero.
    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_quat(self.to_quat())
    }

    #[inline]
    pub fn get(&self, axis: usize) -> f64 {
        self.angles[axis]
    }

    #[inline]
    pub fn set(&mut self, axis: usize, angle: f64) {
        self.angles[axis] = angle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use strum::IntoEnumIterator;

    fn approx_q(a: DQuat, b: DQuat) -> bool {
        a.dot(b).abs() > 1.0 - 1e-10
    }

    #[test]
    fn xyz_applies_x_first() {
        let euler = Euler::new(DVec3::new(0.3, -0.4, 1.1), RotationOrder::XYZ);
        let expected =
            DQuat::from_rotation_z(1.1) * DQuat::from_rotation_y(-0.4) * DQuat::from_rotation_x(0.3);
        assert!(approx_q(euler.to_quat(), expected));
    }

    #[test]
    fn yzx_applies_y_first() {
        let euler = Euler::new(DVec3::new(0.2, 0.5, -0.7), RotationOrder::YZX);
        let expected =
            DQuat::from_rotation_x(0.2) * DQuat::from_rotation_z(-0.7) * DQuat::from_rotation_y(0.5);
        assert!(approx_q(euler.to_quat(), expected));
    }

    #[test]
    fn decompose_recovers_angles_in_every_order() {
        let angles = DVec3::new(0.25, -0.6, 0.9);
        for order in RotationOrder::iter() {
            let euler = Euler::new(angles, order);
            let back = Euler::from_mat4(&euler.to_mat4(), order);
            assert!(
                back.angles.abs_diff_eq(angles, 1e-9),
                "{order}: {:?} != {:?}",
                back.angles,
                angles
            );
        }
    }

    #[test]
    fn single_axis_rotation_lands_on_its_axis() {
        let rotation = DQuat::from_rotation_z(-FRAC_PI_2);
        let euler = Euler::from_quat(rotation, RotationOrder::ZYX);
        assert!((euler.get(2) + FRAC_PI_2).abs() < 1e-9);
        assert!(euler.get(0).abs() < 1e-9);
        assert!(euler.get(1).abs() < 1e-9);
    }

    #[test]
    fn middle_angle_past_quarter_turn_keeps_outer_axes_at_zero() {
        let rotation = DQuat::from_rotation_y(2.84);
        for order in [RotationOrder::XYZ, RotationOrder::ZYX] {
            let euler = Euler::from_quat(rotation, order);
            assert!(
                euler.angles.abs_diff_eq(DVec3::new(0.0, 2.84, 0.0), 1e-9),
                "{order}: {:?}",
                euler.angles
            );
        }
    }

    #[test]
    fn smallest_solution_still_reproduces_rotation() {
        let rotation = DQuat::from_rotation_z(2.5) * DQuat::from_rotation_x(-2.9);
        for order in RotationOrder::iter() {
            let euler = Euler::from_quat(rotation, order);
            assert!(approx_q(euler.to_quat(), rotation), "{order}");
            assert!(euler.angles.abs().element_sum() <= 2.5 + 2.9 + 1e-9, "{order}");
        }
    }

    #[test]
    fn order_parses_from_string() {
        assert_eq!("YZX".parse::<RotationOrder>().unwrap(), RotationOrder::YZX);
        assert!("QUATERNION".parse::<RotationOrder>().is_err());
        assert_eq!(RotationOrder::ZXY.to_string(), "ZXY");
    }
}
