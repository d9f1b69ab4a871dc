use std::path::{Path, PathBuf};

use ahash::{HashMap, HashMapExt};
use tracing::info;

use crate::{
    config::{ConfigError, ConfigLines, write_t_pose},
    retarget::RetargetError,
};

use super::TPoseTable;

/// Name of the computed T-pose, always listed first.
pub const DEFAULT_T_POSE_NAME: &str = "Default";

const EXTENSION: &str = "tpose";

/// A directory of `*.tpose` files. Tables are loaded once and cached by name.
pub struct TPoseLibrary {
    root: PathBuf,
    cache: HashMap<String, TPoseTable>,
}

impl TPoseLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// "Default" followed by the capitalised names of every T-pose file, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(capitalize)
            })
            .collect();
        names.sort();
        names.dedup();

        std::iter::once(DEFAULT_T_POSE_NAME.to_string())
            .chain(names)
            .collect()
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name.to_lowercase()).with_extension(EXTENSION)
    }

    /// Add a table without going through the file system.
    pub fn insert(&mut self, table: TPoseTable) {
        self.cache.insert(table.name.clone(), table);
    }

    pub fn load(&mut self, name: &str) -> Result<&TPoseTable, RetargetError> {
        if !self.cache.contains_key(name) {
            let path = self.path_of(name);
            info!("Loading {}", path.display());

            let mut table = TPoseTable::try_from(ConfigLines::read(&path)?)?;
            if table.name.is_empty() {
                table.name = name.to_string();
            }
            self.cache.insert(name.to_string(), table);
        }

        self.cache.get(name).ok_or_else(|| {
            RetargetError::ConstraintResolution(format!("T-pose {name} is not cached"))
        })
    }

    pub fn save(&self, table: &TPoseTable) -> Result<PathBuf, ConfigError> {
        let path = self.path_of(&table.name);
        info!("Saving {}", path.display());
        std::fs::write(&path, write_t_pose(table)).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
