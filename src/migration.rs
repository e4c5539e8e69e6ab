//! Forward-only save migration pipeline.
//!
//! Takes raw save text of unknown version and returns text at
//! [`CURRENT_SAVE_VERSION`], applying one registered step per version. The
//! pipeline never touches storage, reads no clock and holds no state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::schema::{SaveDataV0, SaveDataV1};
use crate::version::{CURRENT_SAVE_VERSION, LEGACY_SAVE_VERSION, SAVE_VERSION_FIELD};

/// How the source version of a payload was determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// `saveVersion` was present and an integer.
    #[default]
    Field,
    /// The payload is an object without `saveVersion`.
    MissingField,
    /// `saveVersion` was present but not an integer.
    NonIntegerField,
    /// The payload is valid JSON but not an object.
    NonObject,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub source_version: u32,
    pub final_version: u32,
    pub applied_steps: Vec<String>,
    pub was_migrated: bool,
    pub failure_reason: Option<String>,
    pub version_source: VersionSource,
}

impl MigrationReport {
    pub fn succeeded(&self) -> bool {
        self.failure_reason.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("save file is empty")]
    Empty,
    #[error("parse error: {0}")]
    Parse(String),
    #[error("save version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("no migrator registered for version {0}")]
    MissingStep(u32),
    #[error("migration {step_id} failed: {message}")]
    StepFailed { step_id: String, message: String },
    #[error("migration {step_id} produced unexpected version {found}")]
    UnexpectedVersion { step_id: String, found: u32 },
}

/// Current-version text plus the record of how it was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedSave {
    pub json: String,
    pub report: MigrationReport,
}

/// A failed pipeline run. The report carries the failure reason.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct MigrationFailure {
    pub error: MigrationError,
    pub report: MigrationReport,
}

#[derive(Clone, Copy)]
struct MigrationStep {
    from_version: u32,
    to_version: u32,
    step_id: &'static str,
    apply: fn(&str) -> Result<String, String>,
}

const MIGRATION_STEPS: &[MigrationStep] = &[MigrationStep {
    from_version: 0,
    to_version: 1,
    step_id: "v0->v1",
    apply: migrate_v0_to_v1,
}];

/// Brings `raw` to the current schema version.
///
/// An already-current payload is returned byte-for-byte with
/// `was_migrated == false`. Intermediate output of a failed run is dropped.
pub fn prepare_for_load(raw: &str) -> Result<PreparedSave, MigrationFailure> {
    let mut report = MigrationReport::default();

    if raw.trim().is_empty() {
        return Err(fail(report, MigrationError::Empty));
    }

    let (source_version, version_source) = match detect_save_version(raw) {
        Ok(detected) => detected,
        Err(err) => return Err(fail(report, err)),
    };
    report.source_version = source_version;
    report.final_version = source_version;
    report.version_source = version_source;

    if source_version > CURRENT_SAVE_VERSION {
        let err = MigrationError::UnsupportedVersion {
            found: source_version,
            supported: CURRENT_SAVE_VERSION,
        };
        return Err(fail(report, err));
    }

    if source_version == CURRENT_SAVE_VERSION {
        return Ok(PreparedSave {
            json: raw.to_string(),
            report,
        });
    }

    let mut current_version = source_version;
    let mut current_json = raw.to_string();
    let mut applied_steps = Vec::new();

    while current_version < CURRENT_SAVE_VERSION {
        let Some(step) = select_step_for(current_version) else {
            return Err(fail(report, MigrationError::MissingStep(current_version)));
        };

        let next_json = match (step.apply)(&current_json) {
            Ok(next) => next,
            Err(message) => {
                let err = MigrationError::StepFailed {
                    step_id: step.step_id.to_string(),
                    message,
                };
                return Err(fail(report, err));
            }
        };

        let next_version = match detect_save_version(&next_json) {
            Ok((version, _)) => version,
            Err(err) => {
                let err = MigrationError::StepFailed {
                    step_id: step.step_id.to_string(),
                    message: format!("output version parse failed: {err}"),
                };
                return Err(fail(report, err));
            }
        };
        if next_version != step.to_version {
            let err = MigrationError::UnexpectedVersion {
                step_id: step.step_id.to_string(),
                found: next_version,
            };
            return Err(fail(report, err));
        }

        applied_steps.push(step.step_id.to_string());
        current_version = next_version;
        current_json = next_json;
    }

    report.final_version = current_version;
    report.was_migrated = !applied_steps.is_empty();
    report.applied_steps = applied_steps;
    Ok(PreparedSave {
        json: current_json,
        report,
    })
}

/// Reads the schema version without decoding the rest of the document.
///
/// Absent or non-integer `saveVersion` and non-object payloads all resolve to
/// the legacy version; only text that is not JSON at all is rejected.
pub fn detect_save_version(raw: &str) -> Result<(u32, VersionSource), MigrationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| MigrationError::Parse(err.to_string()))?;
    let Some(root) = value.as_object() else {
        return Ok((LEGACY_SAVE_VERSION, VersionSource::NonObject));
    };
    let Some(raw_version) = root.get(SAVE_VERSION_FIELD) else {
        return Ok((LEGACY_SAVE_VERSION, VersionSource::MissingField));
    };
    match integral_version(raw_version) {
        Some(version) => {
            let clamped = u32::try_from(version.max(0)).unwrap_or(u32::MAX);
            Ok((clamped, VersionSource::Field))
        }
        None => Ok((LEGACY_SAVE_VERSION, VersionSource::NonIntegerField)),
    }
}

/// `1` and `1.0` both name version 1; `1.5` names none.
fn integral_version(value: &Value) -> Option<i64> {
    if let Some(version) = value.as_i64() {
        return Some(version);
    }
    if value.is_u64() {
        return Some(i64::MAX);
    }
    let float = value.as_f64()?;
    if !float.is_finite() || float.fract() != 0.0 {
        return None;
    }
    Some(float.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

fn select_step_for(version: u32) -> Option<&'static MigrationStep> {
    MIGRATION_STEPS
        .iter()
        .find(|step| step.from_version == version)
}

fn fail(mut report: MigrationReport, error: MigrationError) -> MigrationFailure {
    report.failure_reason = Some(error.to_string());
    MigrationFailure { error, report }
}

fn migrate_v0_to_v1(input: &str) -> Result<String, String> {
    let legacy: SaveDataV0 = serde_json::from_str(input).map_err(|err| err.to_string())?;
    let mut upgraded =
        serde_json::to_value(SaveDataV1::from(legacy)).map_err(|err| err.to_string())?;
    let source: Value = serde_json::from_str(input).map_err(|err| err.to_string())?;
    carry_forward(&mut upgraded, source);
    let checked: SaveDataV1 = serde_json::from_value(upgraded).map_err(|err| err.to_string())?;
    serde_json::to_string_pretty(&checked).map_err(|err| err.to_string())
}

/// Copies every field of `source` that the upgraded shape also knows onto
/// `target`, recursing into objects. Fields a step's input shape cannot name
/// (written by a newer build, or under a malformed version) survive the step.
fn carry_forward(target: &mut Value, source: Value) {
    let (Value::Object(target), Value::Object(source)) = (target, source) else {
        return;
    };
    for (key, value) in source {
        if key == SAVE_VERSION_FIELD {
            continue;
        }
        let Some(slot) = target.get_mut(&key) else {
            continue;
        };
        if slot.is_object() && value.is_object() {
            carry_forward(slot, value);
        } else {
            *slot = value;
        }
    }
}

#[cfg(test)]
#[path = "tests/migration_tests.rs"]
mod tests;
