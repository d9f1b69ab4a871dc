pub mod animation;
pub mod config;
pub mod math;
pub mod retarget;
pub mod skeleton;
pub mod tpose;
