use glam::{DQuat, DVec3, DVec4};

pub trait Interpolate: Copy {
    fn interpolate(left: Self, right: Self, n: f64) -> Self;
}

impl Interpolate for f64 {
    #[inline]
    fn interpolate(left: Self, right: Self, n: f64) -> Self {
        left + (right - left) * n
    }
}

impl Interpolate for DVec3 {
    #[inline]
    fn interpolate(left: Self, right: Self, n: f64) -> Self {
        left.lerp(right, n)
    }
}

impl Interpolate for DVec4 {
    #[inline]
    fn interpolate(left: Self, right: Self, n: f64) -> Self {
        left.lerp(right, n)
    }
}

impl Interpolate for DQuat {
    #[inline]
    fn interpolate(left: Self, right: Self, n: f64) -> Self {
        left.slerp(right, n)
    }
}
