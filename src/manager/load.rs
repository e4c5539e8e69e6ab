use std::path::PathBuf;

use tracing::{error, info, warn};

use super::normalize::{fresh_profile, local_date_string, normalize_profile};
use super::{LoadOutcome, LoadPhase, LoadReport, SaveManager};
use crate::clock::Clock;
use crate::error::{SaveError, SaveResult};
use crate::fs::{with_suffix, SaveFileSystem};
use crate::migration::{self, MigrationError, MigrationReport, VersionSource};
use crate::schema::SaveDataV1;
use crate::version::{CORRUPT_FILE_MARKER, CORRUPT_TIMESTAMP_FORMAT};

impl<F: SaveFileSystem, C: Clock> SaveManager<F, C> {
    /// Loads the slot, migrating and repairing it as needed.
    ///
    /// A missing file yields a fresh profile. An unreadable file is copied to
    /// a `.corrupt_<timestamp>` sibling and replaced by a fresh profile. A file
    /// written by a newer build is left untouched, writes are blocked and the
    /// error is returned.
    pub fn load_or_create(&mut self) -> SaveResult<LoadReport> {
        let path = self.config.save_path.clone();
        self.blocked_reason = None;

        if !self.fs.exists(&path) {
            info!(path = %path.display(), "no profile found; creating a new one");
            let profile = fresh_profile(&self.config, self.clock.local_today());
            return Ok(self.install_default(profile, LoadOutcome::CreatedNew, None, None));
        }

        let raw = match self.fs.read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => return self.recover_with_default(format!("read failed: {err}"), None),
        };

        let prepared = match migration::prepare_for_load(&raw) {
            Ok(prepared) => prepared,
            Err(failure) => {
                if let MigrationError::UnsupportedVersion { .. } = failure.error {
                    return Err(self.reject(failure.error.into(), &failure.report));
                }
                let reason = failure.error.to_string();
                return self.recover_with_default(reason, Some(failure.report));
            }
        };
        log_version_source(&prepared.report);

        let mut profile: SaveDataV1 = match serde_json::from_str(&prepared.json) {
            Ok(profile) => profile,
            Err(err) => {
                return self
                    .recover_with_default(format!("parse error: {err}"), Some(prepared.report))
            }
        };

        let today = self.clock.local_today();
        normalize_profile(&mut profile, &self.config, today);
        profile.last_login_local_date = local_date_string(today);

        let migrated = prepared.report.was_migrated;
        if migrated {
            info!(
                from = prepared.report.source_version,
                to = prepared.report.final_version,
                steps = ?prepared.report.applied_steps,
                "profile migrated"
            );
        } else {
            info!(path = %path.display(), "profile loaded");
        }

        self.current = profile;
        self.phase = LoadPhase::Ready;
        self.publish_change();

        // An upgraded document must reach storage before anything else runs.
        let persisted = self.persist_after_load(migrated);
        let outcome = if migrated {
            LoadOutcome::Migrated
        } else {
            LoadOutcome::LoadedCurrent
        };
        Ok(LoadReport {
            outcome,
            migration: Some(prepared.report),
            backup_path: None,
            persisted,
        })
    }

    fn recover_with_default(
        &mut self,
        reason: String,
        report: Option<MigrationReport>,
    ) -> SaveResult<LoadReport> {
        let path = self.config.save_path.clone();
        let stamp = self.clock.utc_now().format(CORRUPT_TIMESTAMP_FORMAT);
        let backup = with_suffix(&path, &format!("{CORRUPT_FILE_MARKER}{stamp}"));

        if let Err(err) = self.fs.copy(&path, &backup, true) {
            // Without a forensic copy the unreadable file must not be replaced.
            let err = SaveError::io(backup, err);
            error!(
                path = %path.display(),
                reason = %reason,
                error = %err,
                "could not back up unreadable profile; writes blocked"
            );
            self.phase = LoadPhase::Rejected;
            self.blocked_reason = Some(format!("unreadable profile could not be backed up: {reason}"));
            return Err(err);
        }
        warn!(
            path = %path.display(),
            backup = %backup.display(),
            reason = %reason,
            "unreadable profile backed up; starting from a default profile"
        );

        let profile = fresh_profile(&self.config, self.clock.local_today());
        Ok(self.install_default(
            profile,
            LoadOutcome::RecoveredWithDefault { reason },
            report,
            Some(backup),
        ))
    }

    fn install_default(
        &mut self,
        profile: SaveDataV1,
        outcome: LoadOutcome,
        migration: Option<MigrationReport>,
        backup_path: Option<PathBuf>,
    ) -> LoadReport {
        self.current = profile;
        self.phase = match outcome {
            LoadOutcome::RecoveredWithDefault { .. } => LoadPhase::DefaultApplied,
            _ => LoadPhase::Ready,
        };
        self.publish_change();
        let persisted = self.persist_after_load(true);
        LoadReport {
            outcome,
            migration,
            backup_path,
            persisted,
        }
    }

    fn reject(&mut self, err: SaveError, report: &MigrationReport) -> SaveError {
        error!(
            path = %self.config.save_path.display(),
            found = report.source_version,
            error = %err,
            "profile rejected; file left untouched and writes blocked"
        );
        self.phase = LoadPhase::Rejected;
        self.blocked_reason = Some(err.to_string());
        err
    }

    fn persist_after_load(&mut self, force_immediate: bool) -> bool {
        match self.save(force_immediate) {
            Ok(outcome) => outcome == super::SaveOutcome::Persisted,
            Err(err) => {
                warn!(error = %err, "post-load save failed; will retry");
                false
            }
        }
    }
}

fn log_version_source(report: &MigrationReport) {
    match report.version_source {
        VersionSource::Field => {}
        VersionSource::MissingField => {
            info!("profile has no saveVersion; reading it as legacy")
        }
        VersionSource::NonIntegerField => {
            warn!("profile saveVersion is not an integer; reading it as legacy")
        }
        VersionSource::NonObject => {
            warn!("profile root is not a JSON object; reading it as legacy")
        }
    }
}
