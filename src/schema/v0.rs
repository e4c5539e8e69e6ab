//! Legacy, unversioned profile shape.
//!
//! These documents predate `saveVersion`; absence of the field is what marks
//! them. Field defaults mirror what the old runtime assumed for missing keys.

use serde::{Deserialize, Serialize};

use super::{FishInventoryEntry, STARTER_HOOK_ID, STARTER_SHIP_ID};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveDataV0 {
    pub copecs: i64,
    pub equipped_ship_id: String,
    pub equipped_hook_id: String,
    pub owned_ships: Vec<String>,
    pub owned_hooks: Vec<String>,
    pub fish_inventory: Vec<FishInventoryEntry>,
    pub tutorial_flags: TutorialFlagsV0,
    pub career_start_local_date: String,
    pub last_login_local_date: String,
    pub stats: SaveStatsV0,
}

impl Default for SaveDataV0 {
    fn default() -> Self {
        Self {
            copecs: 0,
            equipped_ship_id: STARTER_SHIP_ID.to_string(),
            equipped_hook_id: STARTER_HOOK_ID.to_string(),
            owned_ships: vec![STARTER_SHIP_ID.to_string()],
            owned_hooks: vec![STARTER_HOOK_ID.to_string()],
            fish_inventory: Vec::new(),
            tutorial_flags: TutorialFlagsV0::default(),
            career_start_local_date: String::new(),
            last_login_local_date: String::new(),
            stats: SaveStatsV0::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TutorialFlagsV0 {
    pub tutorial_seen: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveStatsV0 {
    pub total_fish_caught: i32,
    pub farthest_distance_tier: i32,
    pub total_trips: i32,
}
