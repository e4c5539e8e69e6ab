//! Current profile shape (`saveVersion: 1`).

use serde::{Deserialize, Serialize};

use super::{FishInventoryEntry, SaveDataV0, STARTER_HOOK_ID, STARTER_SHIP_ID};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveDataV1 {
    pub save_version: i32,
    pub copecs: i64,
    pub equipped_ship_id: String,
    pub equipped_hook_id: String,
    pub owned_ships: Vec<String>,
    pub owned_hooks: Vec<String>,
    pub fish_inventory: Vec<FishInventoryEntry>,
    pub catch_log: Vec<CatchLogEntry>,
    pub tutorial_flags: TutorialFlags,
    pub career_start_local_date: String,
    pub last_login_local_date: String,
    pub stats: SaveStats,
    pub progression: ProgressionData,
    pub objective_progress: ObjectiveProgressData,
}

impl Default for SaveDataV1 {
    fn default() -> Self {
        Self {
            save_version: 1,
            copecs: 0,
            equipped_ship_id: STARTER_SHIP_ID.to_string(),
            equipped_hook_id: STARTER_HOOK_ID.to_string(),
            owned_ships: vec![STARTER_SHIP_ID.to_string()],
            owned_hooks: vec![STARTER_HOOK_ID.to_string()],
            fish_inventory: Vec::new(),
            catch_log: Vec::new(),
            tutorial_flags: TutorialFlags::default(),
            career_start_local_date: String::new(),
            last_login_local_date: String::new(),
            stats: SaveStats::default(),
            progression: ProgressionData::default(),
            objective_progress: ObjectiveProgressData::default(),
        }
    }
}

impl From<SaveDataV0> for SaveDataV1 {
    fn from(legacy: SaveDataV0) -> Self {
        Self {
            save_version: 1,
            copecs: legacy.copecs,
            equipped_ship_id: legacy.equipped_ship_id,
            equipped_hook_id: legacy.equipped_hook_id,
            owned_ships: legacy.owned_ships,
            owned_hooks: legacy.owned_hooks,
            fish_inventory: legacy.fish_inventory,
            catch_log: Vec::new(),
            tutorial_flags: TutorialFlags {
                tutorial_seen: legacy.tutorial_flags.tutorial_seen,
                ..TutorialFlags::default()
            },
            career_start_local_date: legacy.career_start_local_date,
            last_login_local_date: legacy.last_login_local_date,
            stats: SaveStats {
                total_fish_caught: legacy.stats.total_fish_caught,
                farthest_distance_tier: legacy.stats.farthest_distance_tier,
                total_trips: legacy.stats.total_trips,
                ..SaveStats::default()
            },
            progression: ProgressionData::default(),
            objective_progress: ObjectiveProgressData::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatchLogEntry {
    pub fish_id: String,
    pub distance_tier: i32,
    pub weight_kg: f32,
    pub value_copecs: i64,
    pub timestamp_utc: String,
    pub session_id: String,
    pub landed: bool,
    pub fail_reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TutorialFlags {
    pub tutorial_seen: bool,
    pub fishing_loop_tutorial_completed: bool,
    pub fishing_loop_tutorial_skipped: bool,
    pub fishing_loop_tutorial_replay_requested: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveStats {
    pub total_fish_caught: i32,
    pub farthest_distance_tier: i32,
    pub total_trips: i32,
    pub total_purchases: i32,
    pub total_catch_value_copecs: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionData {
    pub level: i32,
    pub total_xp: i32,
    pub xp_into_level: i32,
    pub xp_to_next_level: i32,
    pub unlocked_content_ids: Vec<String>,
    pub last_unlock_id: String,
}

impl Default for ProgressionData {
    fn default() -> Self {
        Self {
            level: 1,
            total_xp: 0,
            xp_into_level: 0,
            xp_to_next_level: 0,
            unlocked_content_ids: Vec::new(),
            last_unlock_id: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectiveProgressData {
    pub entries: Vec<ObjectiveProgressEntry>,
    pub completed_objectives: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectiveProgressEntry {
    pub id: String,
    pub description: String,
    pub current_count: i32,
    pub target_count: i32,
    pub reward_copecs: i64,
    pub completed: bool,
}
