use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{SaveError, SaveResult};
use crate::fs::with_suffix;
use crate::progression::{
    default_unlocks, normalize_thresholds, normalize_unlocks, UnlockDefinition,
    DEFAULT_LEVEL_XP_THRESHOLDS,
};
use crate::version::{BACKUP_FILE_SUFFIX, SAVE_FILE_NAME, TEMP_FILE_SUFFIX};

/// User-facing save settings, usually read from `save.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Directory holding the save slot. `None` selects the platform data dir.
    pub save_dir: Option<PathBuf>,
    pub file_name: String,
    pub min_write_interval_secs: f64,
    pub max_catch_log_entries: usize,
    /// Consecutive failed writes before an error-level diagnostic is logged.
    pub repeated_failure_threshold: u32,
    pub level_xp_thresholds: Vec<i32>,
    pub unlocks: Vec<UnlockDefinition>,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_dir: None,
            file_name: SAVE_FILE_NAME.to_string(),
            min_write_interval_secs: 1.0,
            max_catch_log_entries: 200,
            repeated_failure_threshold: 3,
            level_xp_thresholds: DEFAULT_LEVEL_XP_THRESHOLDS.to_vec(),
            unlocks: default_unlocks(),
        }
    }
}

impl SaveConfig {
    pub fn from_toml_str(content: &str) -> SaveResult<Self> {
        toml::from_str(content).map_err(|err| SaveError::Config(err.to_string()))
    }

    /// Loads a config file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> SaveResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(SaveError::io(path, err)),
        }
    }

    pub fn to_toml_string(&self) -> SaveResult<String> {
        toml::to_string_pretty(self).map_err(|err| SaveError::Config(err.to_string()))
    }

    /// A config pointing at `dir` with every other field at its default.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn resolve(&self) -> ResolvedSaveConfig {
        let save_dir = self.save_dir.clone().unwrap_or_else(default_save_dir);
        let file_name = if self.file_name.trim().is_empty() {
            SAVE_FILE_NAME.to_string()
        } else {
            self.file_name.trim().to_string()
        };
        let min_write_interval_secs = if self.min_write_interval_secs.is_finite() {
            self.min_write_interval_secs.max(0.0)
        } else {
            0.0
        };

        ResolvedSaveConfig {
            save_path: save_dir.join(file_name),
            save_dir,
            min_write_interval_secs,
            max_catch_log_entries: self.max_catch_log_entries.max(1),
            repeated_failure_threshold: self.repeated_failure_threshold.max(1),
            level_xp_thresholds: normalize_thresholds(&self.level_xp_thresholds),
            unlocks: normalize_unlocks(&self.unlocks),
        }
    }
}

/// Validated settings consumed by the save manager.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSaveConfig {
    pub save_dir: PathBuf,
    pub save_path: PathBuf,
    pub min_write_interval_secs: f64,
    pub max_catch_log_entries: usize,
    pub repeated_failure_threshold: u32,
    pub level_xp_thresholds: Vec<i32>,
    pub unlocks: Vec<UnlockDefinition>,
}

impl ResolvedSaveConfig {
    pub fn temp_path(&self) -> PathBuf {
        with_suffix(&self.save_path, TEMP_FILE_SUFFIX)
    }

    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.save_path, BACKUP_FILE_SUFFIX)
    }
}

pub fn default_save_dir() -> PathBuf {
    ProjectDirs::from("com", "RavenDevOps", "Fishing")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
