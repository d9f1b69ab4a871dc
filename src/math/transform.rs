use glam::{DMat4, DQuat, DVec3};

use super::{Euler, RotationOrder};

/// A translation and rotation that can be converted into a 4x4 matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl Transform {
    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Create a new transform from a translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation,
        }
    }

    /// Create a new transform from euler angles (radians) applied in the given order.
    pub fn from_euler_rotation(angles: DVec3, order: RotationOrder) -> Self {
        Self::from_rotation(Euler::new(angles, order).to_quat())
    }

    /// Split a rigid matrix into its rotation and translation. Any scale is dropped.
    pub fn from_mat4(matrix: &DMat4) -> Self {
        let (_, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation: rotation.normalize(),
        }
    }

    pub fn with_translation(mut self, translation: DVec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: DQuat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic() {
        let transform = Transform::default().to_mat4();
        assert_eq!(transform, DMat4::IDENTITY);

        let transform = Transform::default()
            .with_rotation(DQuat::from_xyzw(0.0, 0.0, 0.0, 1.0))
            .to_mat4();
        assert_eq!(transform, DMat4::IDENTITY);

        let transform = Transform::default()
            .with_translation(DVec3::new(10.0, 8.0, 6.0))
            .to_mat4();

        let transform = transform * Transform::default().to_mat4();

        assert_eq!(
            transform,
            DMat4::from_translation(DVec3::new(10.0, 8.0, 6.0))
        );
    }

    #[test]
    fn matrix_round_trip_keeps_rotation_and_translation() {
        let source = Transform::new(
            DVec3::new(1.0, -2.0, 0.5),
            DQuat::from_rotation_y(0.7) * DQuat::from_rotation_x(-0.3),
        );
        let back = Transform::from_mat4(&source.to_mat4());

        assert!(back.translation.abs_diff_eq(source.translation, 1e-12));
        assert!(back.rotation.dot(source.rotation).abs() > 1.0 - 1e-12);
    }
}
