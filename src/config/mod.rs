//! Line based definition files: armatures, rig definitions, T-pose tables and settings.

mod armature_defs;
pub mod parser;
mod rig_defs;
mod settings;
mod t_pose_defs;

pub use parser::{ConfigLine, ConfigLines, ConfigToken};
pub use rig_defs::RigDef;
pub use t_pose_defs::write_t_pose;

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Read and parse a definition file.
pub fn load<T>(path: &Path) -> Result<T, ConfigError>
where
    T: TryFrom<ConfigLines, Error = ConfigError>,
{
    T::try_from(ConfigLines::read(path)?)
}
