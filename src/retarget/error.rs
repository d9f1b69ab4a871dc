use thiserror::Error;

use crate::{animation::Frame, config::ConfigError};

#[derive(Debug, Error, PartialEq)]
pub enum MappingError {
    #[error("No usable bone pairs between the source and target armatures")]
    NoValidPairs,

    #[error("Required root bone is not mapped ({0})")]
    RootUnmapped(String),

    #[error("Parent hints form a cycle ({0})")]
    Cycle(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum RetargetError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("No frames found")]
    EmptyAnimation,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Could not resolve constraint or T-pose: {0}")]
    ConstraintResolution(String),

    #[error("Missing bone {bone} at frame {frame}")]
    MissingBone { bone: String, frame: Frame },
}

impl From<ConfigError> for RetargetError {
    fn from(value: ConfigError) -> Self {
        RetargetError::ConstraintResolution(value.to_string())
    }
}
