use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::migration::MigrationError;

pub type SaveResult<T> = Result<T, SaveError>;

#[derive(Debug, Error, Diagnostic)]
pub enum SaveError {
    #[error("parse error: {0}")]
    #[diagnostic(code("save.parse"))]
    Parse(String),
    #[error("save version {found} is newer than supported version {supported}")]
    #[diagnostic(
        code("save.unsupported_version"),
        help("this profile was written by a newer build; update the game to load it")
    )]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("migration {step_id} failed: {message}")]
    #[diagnostic(code("save.migration_step"))]
    MigrationStep { step_id: String, message: String },
    #[error("io error on '{}': {source}", .path.display())]
    #[diagnostic(code("save.io"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    #[diagnostic(code("save.serialization"))]
    Serialization(String),
    #[error("save profile has not been loaded")]
    #[diagnostic(code("save.not_loaded"), help("call load_or_create before mutating"))]
    NotLoaded,
    #[error("writes are blocked: {0}")]
    #[diagnostic(code("save.writes_blocked"))]
    WritesBlocked(String),
    #[error("config error: {0}")]
    #[diagnostic(code("save.config"))]
    Config(String),
}

impl SaveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SaveError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<MigrationError> for SaveError {
    fn from(value: MigrationError) -> Self {
        match value {
            MigrationError::Empty => SaveError::Parse(value.to_string()),
            MigrationError::Parse(detail) => SaveError::Parse(detail),
            MigrationError::UnsupportedVersion { found, supported } => {
                SaveError::UnsupportedVersion { found, supported }
            }
            MigrationError::MissingStep(version) => SaveError::MigrationStep {
                step_id: format!("v{version}->v{}", version.saturating_add(1)),
                message: "no migrator registered".to_string(),
            },
            MigrationError::StepFailed { step_id, message } => {
                SaveError::MigrationStep { step_id, message }
            }
            MigrationError::UnexpectedVersion { ref step_id, .. } => SaveError::MigrationStep {
                step_id: step_id.clone(),
                message: value.to_string(),
            },
        }
    }
}
