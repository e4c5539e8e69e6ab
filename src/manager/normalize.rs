use chrono::NaiveDate;

use crate::config::ResolvedSaveConfig;
use crate::progression::{resolve_xp_progress, UnlockDefinition, UnlockKind};
use crate::schema::{CatchLogEntry, SaveDataV1, STARTER_HOOK_ID, STARTER_SHIP_ID};
use crate::version::{CURRENT_SAVE_VERSION, LOCAL_DATE_FORMAT};

pub(super) fn local_date_string(date: NaiveDate) -> String {
    date.format(LOCAL_DATE_FORMAT).to_string()
}

pub(super) fn fresh_profile(config: &ResolvedSaveConfig, today: NaiveDate) -> SaveDataV1 {
    let stamp = local_date_string(today);
    let mut profile = SaveDataV1 {
        career_start_local_date: stamp.clone(),
        last_login_local_date: stamp,
        ..SaveDataV1::default()
    };
    normalize_profile(&mut profile, config, today);
    profile
}

/// Repairs a freshly loaded document so every invariant the mutation helpers
/// rely on holds.
pub(super) fn normalize_profile(
    profile: &mut SaveDataV1,
    config: &ResolvedSaveConfig,
    today: NaiveDate,
) {
    profile.save_version = CURRENT_SAVE_VERSION as i32;

    if profile.owned_ships.is_empty() {
        profile.owned_ships.push(STARTER_SHIP_ID.to_string());
    }
    if profile.owned_hooks.is_empty() {
        profile.owned_hooks.push(STARTER_HOOK_ID.to_string());
    }
    if profile.equipped_ship_id.trim().is_empty() {
        profile.equipped_ship_id = profile.owned_ships[0].clone();
    }
    if profile.equipped_hook_id.trim().is_empty() {
        profile.equipped_hook_id = profile.owned_hooks[0].clone();
    }

    if profile.career_start_local_date.trim().is_empty() {
        profile.career_start_local_date = local_date_string(today);
    }
    if profile.last_login_local_date.trim().is_empty() {
        profile.last_login_local_date = profile.career_start_local_date.clone();
    }

    trim_catch_log(&mut profile.catch_log, config.max_catch_log_entries);

    let progression = &mut profile.progression;
    progression.total_xp = progression.total_xp.max(0);
    let progress = resolve_xp_progress(progression.total_xp, &config.level_xp_thresholds);
    progression.level = progress.level;
    progression.xp_into_level = progress.xp_into_level;
    progression.xp_to_next_level = progress.xp_to_next_level;

    let level = profile.progression.level;
    apply_unlocks(profile, &config.unlocks, 1, level);
}

/// Drops the oldest entries beyond `max_entries`.
pub(super) fn trim_catch_log(log: &mut Vec<CatchLogEntry>, max_entries: usize) {
    if log.len() > max_entries {
        let excess = log.len() - max_entries;
        log.drain(..excess);
    }
}

/// Grants every unlock whose level lies in `min_level..=max_level`.
pub(super) fn apply_unlocks(
    profile: &mut SaveDataV1,
    unlocks: &[UnlockDefinition],
    min_level: i32,
    max_level: i32,
) {
    for unlock in unlocks
        .iter()
        .filter(|unlock| (min_level..=max_level).contains(&unlock.level))
    {
        let ids = &mut profile.progression.unlocked_content_ids;
        if !ids.contains(&unlock.unlock_id) {
            ids.push(unlock.unlock_id.clone());
            profile.progression.last_unlock_id = unlock.unlock_id.clone();
        }

        let owned = match unlock.kind {
            UnlockKind::Ship => &mut profile.owned_ships,
            UnlockKind::Hook => &mut profile.owned_hooks,
            UnlockKind::Content => continue,
        };
        if !owned.contains(&unlock.unlock_id) {
            owned.push(unlock.unlock_id.clone());
        }
    }
}
