//! Owner of the live profile.
//!
//! [`SaveManager`] loads the slot through the migration pipeline, hands out
//! read-only views, applies mutations, publishes change events and persists
//! under [`WriteThrottle`] control. Storage and time are injected.

mod load;
mod mutations;
mod normalize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedSaveConfig;
use crate::error::{SaveError, SaveResult};
use crate::events::{EventBus, ListenerId, SaveEvent};
use crate::fs::{DiskFileSystem, SaveFileSystem};
use crate::migration::MigrationReport;
use crate::progression;
use crate::schema::SaveDataV1;
use crate::throttle::WriteThrottle;

pub use mutations::CatchOutcome;

/// Where the manager stands after its last load attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Unloaded,
    /// A stored profile (possibly migrated) or a brand new one is live.
    Ready,
    /// The stored file was unreadable; it was backed up and replaced by a
    /// default profile.
    DefaultApplied,
    /// The stored file cannot be used and must not be overwritten.
    Rejected,
}

impl LoadPhase {
    pub fn accepts_writes(self) -> bool {
        matches!(self, LoadPhase::Ready | LoadPhase::DefaultApplied)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    CreatedNew,
    LoadedCurrent,
    Migrated,
    RecoveredWithDefault { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub outcome: LoadOutcome,
    pub migration: Option<MigrationReport>,
    /// Forensic copy written before the unreadable file was replaced.
    pub backup_path: Option<PathBuf>,
    /// Whether the post-load write reached storage. A failed write stays
    /// pending and is retried by [`SaveManager::flush_pending`].
    pub persisted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Persisted,
    Deferred,
    Idle,
}

pub struct SaveManager<F: SaveFileSystem = DiskFileSystem, C: Clock = SystemClock> {
    config: ResolvedSaveConfig,
    fs: F,
    clock: C,
    throttle: WriteThrottle,
    current: SaveDataV1,
    phase: LoadPhase,
    blocked_reason: Option<String>,
    revision: u64,
    session_id: String,
    events: EventBus,
    consecutive_failures: u32,
}

impl SaveManager<DiskFileSystem, SystemClock> {
    pub fn on_disk(config: ResolvedSaveConfig) -> Self {
        Self::new(config, DiskFileSystem, SystemClock::new())
    }
}

impl<F: SaveFileSystem, C: Clock> SaveManager<F, C> {
    pub fn new(config: ResolvedSaveConfig, fs: F, clock: C) -> Self {
        let throttle = WriteThrottle::new(config.min_write_interval_secs);
        Self {
            config,
            fs,
            clock,
            throttle,
            current: SaveDataV1::default(),
            phase: LoadPhase::Unloaded,
            blocked_reason: None,
            revision: 0,
            session_id: Uuid::new_v4().simple().to_string(),
            events: EventBus::new(),
            consecutive_failures: 0,
        }
    }

    pub fn current(&self) -> &SaveDataV1 {
        &self.current
    }

    /// Owned copy of the live profile, safe to keep across mutations.
    pub fn snapshot(&self) -> Arc<SaveDataV1> {
        Arc::new(self.current.clone())
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn blocked_reason(&self) -> Option<&str> {
        self.blocked_reason.as_deref()
    }

    pub fn config(&self) -> &ResolvedSaveConfig {
        &self.config
    }

    pub fn save_path(&self) -> &Path {
        &self.config.save_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Incremented on every in-memory change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending_write(&self) -> bool {
        self.throttle.has_pending_request()
    }

    pub fn consecutive_write_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    pub fn file_system_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SaveEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn level(&self) -> i32 {
        self.current.progression.level.max(1)
    }

    pub fn total_xp(&self) -> i32 {
        self.current.progression.total_xp.max(0)
    }

    pub fn xp_into_level(&self) -> i32 {
        self.current.progression.xp_into_level.max(0)
    }

    pub fn xp_to_next_level(&self) -> i32 {
        self.current.progression.xp_to_next_level.max(0)
    }

    /// 1-based day of the career as of the clock's local date.
    pub fn day_number(&self) -> i32 {
        progression::day_number(
            &self.current.career_start_local_date,
            self.clock.local_today(),
        )
    }

    /// Requests a write of the live profile.
    ///
    /// Without `force_immediate` the write may be deferred by the throttle;
    /// [`SaveManager::flush_pending`] performs it once eligible.
    pub fn save(&mut self, force_immediate: bool) -> SaveResult<SaveOutcome> {
        self.ensure_writable()?;
        let now = self.clock.realtime_seconds();
        if !self.throttle.request(now, force_immediate) {
            debug!(
                path = %self.config.save_path.display(),
                "save deferred by write throttle"
            );
            return Ok(SaveOutcome::Deferred);
        }
        self.persist_now(now)?;
        Ok(SaveOutcome::Persisted)
    }

    /// Writes a deferred or previously failed save once the throttle allows
    /// it. Meant to be called from the host's frame or timer tick.
    pub fn flush_pending(&mut self) -> SaveResult<SaveOutcome> {
        if !self.phase.accepts_writes() {
            return Ok(SaveOutcome::Idle);
        }
        let now = self.clock.realtime_seconds();
        if !self.throttle.try_flush(now) {
            return Ok(SaveOutcome::Idle);
        }
        self.persist_now(now)?;
        Ok(SaveOutcome::Persisted)
    }

    /// Final forced write on clean exit. No-op when nothing was loaded or
    /// writes are blocked.
    pub fn shutdown(&mut self) -> SaveResult<SaveOutcome> {
        if !self.phase.accepts_writes() {
            info!(phase = ?self.phase, "shutdown without final save");
            return Ok(SaveOutcome::Idle);
        }
        let outcome = self.save(true)?;
        info!(path = %self.config.save_path.display(), "profile saved on shutdown");
        Ok(outcome)
    }

    fn ensure_writable(&self) -> SaveResult<()> {
        match self.phase {
            LoadPhase::Unloaded => Err(SaveError::NotLoaded),
            LoadPhase::Rejected => Err(SaveError::WritesBlocked(
                self.blocked_reason
                    .clone()
                    .unwrap_or_else(|| "stored profile was rejected".to_string()),
            )),
            LoadPhase::Ready | LoadPhase::DefaultApplied => Ok(()),
        }
    }

    /// Bumps the revision and publishes the new state to listeners.
    fn publish_change(&mut self) {
        self.revision += 1;
        let event = SaveEvent::DataChanged {
            revision: self.revision,
            snapshot: self.snapshot(),
        };
        self.events.emit(&event);
    }

    /// Throttled save after a mutation. The in-memory change already
    /// happened, so a failed write is left pending for the next flush.
    fn request_save(&mut self) {
        if let Err(err) = self.save(false) {
            warn!(error = %err, "save after mutation failed; will retry");
        }
    }

    fn persist_now(&mut self, now: f64) -> SaveResult<()> {
        let json = serde_json::to_string_pretty(&self.current)
            .map_err(|err| SaveError::Serialization(err.to_string()))?;

        match self.write_atomically(&json) {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    info!(
                        failures = self.consecutive_failures,
                        "profile write recovered"
                    );
                }
                self.consecutive_failures = 0;
                self.throttle.mark_persisted(now);
                debug!(
                    path = %self.config.save_path.display(),
                    bytes = json.len(),
                    "profile persisted"
                );
                Ok(())
            }
            Err(err) => {
                self.throttle.mark_pending();
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= self.config.repeated_failure_threshold {
                    error!(
                        failures = self.consecutive_failures,
                        error = %err,
                        "profile writes keep failing; progress since the last good save is at risk"
                    );
                } else {
                    warn!(
                        failures = self.consecutive_failures,
                        error = %err,
                        "profile write failed; retry pending"
                    );
                }
                Err(err)
            }
        }
    }

    /// Stages the document next to the slot and swaps it in. The previous
    /// file survives every failure before the swap.
    fn write_atomically(&mut self, json: &str) -> SaveResult<()> {
        let save_path = self.config.save_path.clone();
        let temp_path = self.config.temp_path();
        let backup_path = self.config.backup_path();

        self.fs
            .ensure_dir(&self.config.save_dir)
            .map_err(|err| SaveError::io(&self.config.save_dir, err))?;

        if let Err(err) = self.fs.write(&temp_path, json) {
            self.discard(&temp_path);
            return Err(SaveError::io(temp_path, err));
        }

        let swapped = if self.fs.exists(&save_path) {
            self.fs.replace(&temp_path, &save_path, Some(&backup_path))
        } else {
            self.fs.rename(&temp_path, &save_path)
        };
        if let Err(err) = swapped {
            self.discard(&temp_path);
            return Err(SaveError::io(save_path, err));
        }

        self.discard(&backup_path);
        Ok(())
    }

    fn discard(&mut self, path: &Path) {
        if !self.fs.exists(path) {
            return;
        }
        if let Err(err) = self.fs.remove(path) {
            warn!(path = %path.display(), error = %err, "could not remove staging file");
        }
    }
}

impl<F: SaveFileSystem, C: Clock> std::fmt::Debug for SaveManager<F, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveManager")
            .field("save_path", &self.config.save_path)
            .field("phase", &self.phase)
            .field("revision", &self.revision)
            .field("pending_write", &self.throttle.has_pending_request())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/manager_tests.rs"]
mod tests;
