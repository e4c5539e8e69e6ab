//! Versioned save document shapes.
//!
//! Every historical shape gets its own record type so the fields that existed
//! at a given version are visible in the type. Only the current shape is
//! mutated at runtime; older shapes exist to be read and upgraded.

mod v0;
mod v1;

use serde::{Deserialize, Serialize};

pub use v0::{SaveDataV0, SaveStatsV0, TutorialFlagsV0};
pub use v1::{
    CatchLogEntry, ObjectiveProgressData, ObjectiveProgressEntry, ProgressionData, SaveDataV1,
    SaveStats, TutorialFlags,
};

pub const STARTER_SHIP_ID: &str = "ship_lv1";
pub const STARTER_HOOK_ID: &str = "hook_lv1";

/// Stack of caught fish of one species at one distance tier.
///
/// Unchanged between v0 and v1, so both shapes share it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FishInventoryEntry {
    pub fish_id: String,
    pub distance_tier: i32,
    pub count: i32,
}
