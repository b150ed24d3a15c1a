use crate::lesson::LessonType;
use crate::persistence::{PersistenceError, PersistenceResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine settings, loadable from TOML.
///
/// ```toml
/// special_types = ["strike", "official_duty", "teacher_absence"]
/// general_module_name = "Geral"
/// database_path = "calendar.db"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lesson types whose slots may be non-lesson slots.
    #[serde(default = "default_special_types")]
    pub special_types: Vec<LessonType>,
    /// Name of the catch-all module created for standard classes.
    #[serde(default = "default_general_module_name")]
    pub general_module_name: String,
    #[serde(default = "default_tolerance")]
    pub default_tolerance: u32,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

fn default_special_types() -> Vec<LessonType> {
    LessonType::DEFAULT_SPECIAL.to_vec()
}

fn default_general_module_name() -> String {
    "General".to_string()
}

fn default_tolerance() -> u32 {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            special_types: default_special_types(),
            general_module_name: default_general_module_name(),
            default_tolerance: default_tolerance(),
            database_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PersistenceResult<Self> {
        toml::from_str(content).map_err(PersistenceError::from)
    }
}
