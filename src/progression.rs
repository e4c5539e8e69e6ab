//! Experience, level and unlock rules applied to the live profile.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::version::LOCAL_DATE_FORMAT;

pub const DEFAULT_LEVEL_XP_THRESHOLDS: [i32; 6] = [0, 100, 250, 450, 700, 1000];

const MIN_CATCH_XP: i32 = 5;
const MAX_CATCH_XP: i32 = 200;

/// XP granted for one landed fish.
///
/// Farther tiers, heavier fish and more valuable fish earn more; the total is
/// clamped to `5..=200`. Halves round to even.
pub fn catch_xp(distance_tier: i32, weight_kg: f32, value_copecs: i64) -> i32 {
    let base: i32 = 10;
    let distance_bonus = distance_tier.saturating_sub(1).max(0).saturating_mul(5);
    let weight_bonus = (weight_kg.max(0.0) * 3.0).round_ties_even() as i32;
    let value_bonus = (value_copecs.max(0) as f64 / 25.0).round_ties_even();
    let value_bonus = value_bonus.min(i32::MAX as f64) as i32;
    base.saturating_add(distance_bonus)
        .saturating_add(weight_bonus)
        .saturating_add(value_bonus)
        .clamp(MIN_CATCH_XP, MAX_CATCH_XP)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XpProgress {
    pub level: i32,
    pub xp_into_level: i32,
    pub xp_to_next_level: i32,
}

/// Level reached with `total_xp`. Levels are 1-based; an empty table means
/// level 1 forever.
pub fn resolve_level(total_xp: i32, thresholds: &[i32]) -> i32 {
    let xp = total_xp.max(0);
    let reached = thresholds.iter().take_while(|&&threshold| xp >= threshold).count();
    (reached as i32).max(1)
}

pub fn resolve_xp_progress(total_xp: i32, thresholds: &[i32]) -> XpProgress {
    let xp = total_xp.max(0);
    if thresholds.is_empty() {
        return XpProgress {
            level: 1,
            xp_into_level: xp,
            xp_to_next_level: 0,
        };
    }

    let level = resolve_level(xp, thresholds);
    let index = ((level - 1) as usize).min(thresholds.len() - 1);
    let current = thresholds[index];
    let next = thresholds.get(index + 1).copied().unwrap_or(current);
    XpProgress {
        level,
        xp_into_level: (xp - current).max(0),
        xp_to_next_level: (next - current).max(0),
    }
}

/// Clamps to non-negative, sorts, deduplicates and guarantees a leading 0.
/// An empty table falls back to [`DEFAULT_LEVEL_XP_THRESHOLDS`].
pub fn normalize_thresholds(raw: &[i32]) -> Vec<i32> {
    let mut thresholds: Vec<i32> = if raw.is_empty() {
        DEFAULT_LEVEL_XP_THRESHOLDS.to_vec()
    } else {
        raw.iter().map(|value| (*value).max(0)).collect()
    };
    thresholds.sort_unstable();
    thresholds.dedup();
    if thresholds.first() != Some(&0) {
        thresholds.insert(0, 0);
    }
    thresholds
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockKind {
    #[default]
    Content,
    Ship,
    Hook,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockDefinition {
    pub level: i32,
    pub kind: UnlockKind,
    pub unlock_id: String,
    pub display_name: String,
}

impl Default for UnlockDefinition {
    fn default() -> Self {
        Self {
            level: 2,
            kind: UnlockKind::Content,
            unlock_id: String::new(),
            display_name: String::new(),
        }
    }
}

impl UnlockDefinition {
    pub fn new(level: i32, kind: UnlockKind, unlock_id: &str, display_name: &str) -> Self {
        Self {
            level,
            kind,
            unlock_id: unlock_id.to_string(),
            display_name: display_name.to_string(),
        }
    }

    /// Display name, or the id when no name is configured.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.unlock_id
        } else {
            &self.display_name
        }
    }

    fn is_valid(&self) -> bool {
        self.level >= 2 && !self.unlock_id.trim().is_empty()
    }
}

pub fn default_unlocks() -> Vec<UnlockDefinition> {
    vec![
        UnlockDefinition::new(2, UnlockKind::Hook, "hook_lv2", "Hook Lv2"),
        UnlockDefinition::new(3, UnlockKind::Ship, "ship_lv2", "Ship Lv2"),
        UnlockDefinition::new(4, UnlockKind::Hook, "hook_lv3", "Hook Lv3"),
        UnlockDefinition::new(5, UnlockKind::Ship, "ship_lv3", "Ship Lv3"),
    ]
}

/// Seeds the default list when nothing is configured, then drops entries
/// below level 2 or without an id and orders the rest by level.
pub fn normalize_unlocks(raw: &[UnlockDefinition]) -> Vec<UnlockDefinition> {
    let mut unlocks = if raw.is_empty() {
        default_unlocks()
    } else {
        raw.to_vec()
    };
    unlocks.retain(UnlockDefinition::is_valid);
    // stable: equal levels keep configured order
    unlocks.sort_by_key(|unlock| unlock.level);
    unlocks
}

/// 1-based day of the career. Unparsable or future start dates count as day 1.
pub fn day_number(career_start_local_date: &str, today: NaiveDate) -> i32 {
    let Ok(start) = NaiveDate::parse_from_str(career_start_local_date.trim(), LOCAL_DATE_FORMAT)
    else {
        return 1;
    };
    let elapsed = today.signed_duration_since(start).num_days();
    i32::try_from(elapsed.saturating_add(1))
        .unwrap_or(i32::MAX)
        .max(1)
}
