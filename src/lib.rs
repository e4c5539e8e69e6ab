//! Player-progress persistence for the fishing game.
//!
//! Versioned save documents, a forward-only migration pipeline, a debounced
//! crash-safe write path and the [`SaveManager`] that ties them together.

mod clock;
mod config;
mod error;
mod events;
mod fs;
mod manager;
mod migration;
mod progression;
mod schema;
mod throttle;
mod version;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{default_save_dir, ResolvedSaveConfig, SaveConfig};
pub use error::{SaveError, SaveResult};
pub use events::{EventBus, ListenerId, SaveEvent};
pub use fs::{with_suffix, DiskFileSystem, FsOp, MemoryFileSystem, SaveFileSystem};
pub use manager::{CatchOutcome, LoadOutcome, LoadPhase, LoadReport, SaveManager, SaveOutcome};
pub use migration::{
    detect_save_version, prepare_for_load, MigrationError, MigrationFailure, MigrationReport,
    PreparedSave, VersionSource,
};
pub use progression::{
    catch_xp, day_number, default_unlocks, normalize_thresholds, normalize_unlocks,
    resolve_level, resolve_xp_progress, UnlockDefinition, UnlockKind, XpProgress,
    DEFAULT_LEVEL_XP_THRESHOLDS,
};
pub use schema::{
    CatchLogEntry, FishInventoryEntry, ObjectiveProgressData, ObjectiveProgressEntry,
    ProgressionData, SaveDataV0, SaveDataV1, SaveStats, SaveStatsV0, TutorialFlags,
    TutorialFlagsV0, STARTER_HOOK_ID, STARTER_SHIP_ID,
};
pub use throttle::WriteThrottle;
pub use version::{
    BACKUP_FILE_SUFFIX, CORRUPT_FILE_MARKER, CORRUPT_TIMESTAMP_FORMAT, CURRENT_SAVE_VERSION,
    LEGACY_SAVE_VERSION, LOCAL_DATE_FORMAT, SAVE_FILE_NAME, SAVE_VERSION_FIELD, TEMP_FILE_SUFFIX,
};
