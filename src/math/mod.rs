//! Bone frame algebra.
//!
//! All matrices are column-major `DMat4`s and compose as `parent * child`. Bone matrices are
//! rigid: a rotation plus a translation in column 3.

mod euler;
mod transform;

pub use euler::{Euler, RotationOrder};
pub use transform::Transform;

use glam::{DMat4, DQuat, DVec3};

/// Below this `|w|` the roll of a rotation is taken to be a half turn.
const ROLL_EPSILON: f64 = 1e-4;

/// Split a rigid matrix into rotation and translation.
#[inline]
pub fn decompose(matrix: &DMat4) -> (DQuat, DVec3) {
    let transform = Transform::from_mat4(matrix);
    (transform.rotation, transform.translation)
}

#[inline]
pub fn compose(rotation: DQuat, translation: DVec3) -> DMat4 {
    DMat4::from_rotation_translation(rotation, translation)
}

#[inline]
pub fn compose_euler(euler: &Euler, translation: DVec3) -> DMat4 {
    compose(euler.to_quat(), translation)
}

#[inline]
pub fn translation(matrix: &DMat4) -> DVec3 {
    matrix.w_axis.truncate()
}

/// Overwrite the translation column, leaving the rotation untouched.
#[inline]
pub fn with_translation(mut matrix: DMat4, translation: DVec3) -> DMat4 {
    matrix.w_axis = translation.extend(1.0);
    matrix
}

/// The rotation of `matrix` as a 4x4 matrix with the translation discarded.
pub fn rotation_part(matrix: &DMat4) -> DMat4 {
    let (rotation, _) = decompose(matrix);
    DMat4::from_quat(rotation)
}

/// Roll of a bone about its own Y axis, `-2 * atan(y / w)` of its rotation.
pub fn roll(matrix: &DMat4) -> f64 {
    let (rotation, _) = decompose(matrix);
    if rotation.w.abs() < ROLL_EPSILON {
        std::f64::consts::PI
    } else {
        -2.0 * (rotation.y / rotation.w).atan()
    }
}
