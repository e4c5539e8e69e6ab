//! Format versioning constants for profile saves.
//!
//! The file name carries a version number for humans only; the authoritative
//! value is the `saveVersion` field inside the document.

/// Highest save schema version this build understands.
/// Increment together with a new entry in the migration step table.
pub const CURRENT_SAVE_VERSION: u32 = 1;

/// Version assumed for documents that carry no usable `saveVersion`.
pub const LEGACY_SAVE_VERSION: u32 = 0;

/// JSON field holding the schema version.
pub const SAVE_VERSION_FIELD: &str = "saveVersion";

/// Default save slot file name.
pub const SAVE_FILE_NAME: &str = "save_v1.json";

/// Suffix of the staging file written before a replace.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Suffix of the copy of the previous file kept while a replace is in flight.
pub const BACKUP_FILE_SUFFIX: &str = ".bak";

/// Marker of forensic copies of unreadable saves.
pub const CORRUPT_FILE_MARKER: &str = ".corrupt_";

/// Timestamp layout appended after [`CORRUPT_FILE_MARKER`] (UTC).
pub const CORRUPT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Layout of `careerStartLocalDate` / `lastLoginLocalDate`.
pub const LOCAL_DATE_FORMAT: &str = "%Y-%m-%d";
