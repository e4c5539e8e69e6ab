use chrono::SecondsFormat;
use tracing::{debug, info};

use super::normalize::{apply_unlocks, trim_catch_log};
use super::SaveManager;
use crate::clock::Clock;
use crate::error::SaveResult;
use crate::events::SaveEvent;
use crate::fs::SaveFileSystem;
use crate::progression::{catch_xp, resolve_xp_progress};
use crate::schema::{
    CatchLogEntry, FishInventoryEntry, SaveDataV1, STARTER_HOOK_ID, STARTER_SHIP_ID,
};

/// Result of [`SaveManager::record_catch`].
#[derive(Clone, Debug, PartialEq)]
pub struct CatchOutcome {
    pub entry: CatchLogEntry,
    pub xp_earned: i32,
    /// `(previous, current)` when the catch crossed a level threshold.
    pub level_up: Option<(i32, i32)>,
}

impl<F: SaveFileSystem, C: Clock> SaveManager<F, C> {
    /// Applies an arbitrary change to the live profile, publishes it and
    /// requests a throttled save.
    pub fn mutate<R>(&mut self, change: impl FnOnce(&mut SaveDataV1) -> R) -> SaveResult<R> {
        self.ensure_writable()?;
        let result = change(&mut self.current);
        self.commit();
        Ok(result)
    }

    /// Adds a positive amount of copecs. Zero or negative amounts are ignored.
    pub fn add_copecs(&mut self, amount: i64) -> SaveResult<()> {
        self.ensure_writable()?;
        if amount <= 0 {
            return Ok(());
        }
        self.current.copecs = self.current.copecs.saturating_add(amount);
        self.commit();
        Ok(())
    }

    pub fn mark_trip_completed(&mut self) -> SaveResult<()> {
        self.ensure_writable()?;
        self.current.stats.total_trips = self.current.stats.total_trips.saturating_add(1);
        self.commit();
        self.events.emit(&SaveEvent::TripCompleted {
            total_trips: self.current.stats.total_trips.max(0),
        });
        Ok(())
    }

    pub fn set_tutorial_seen(&mut self, seen: bool) -> SaveResult<()> {
        self.ensure_writable()?;
        if self.current.tutorial_flags.tutorial_seen == seen {
            return Ok(());
        }
        self.current.tutorial_flags.tutorial_seen = seen;
        self.commit();
        Ok(())
    }

    pub fn should_run_fishing_loop_tutorial(&self) -> bool {
        let flags = &self.current.tutorial_flags;
        !flags.fishing_loop_tutorial_completed || flags.fishing_loop_tutorial_replay_requested
    }

    pub fn request_fishing_loop_tutorial_replay(&mut self) -> SaveResult<()> {
        self.ensure_writable()?;
        let flags = &mut self.current.tutorial_flags;
        flags.fishing_loop_tutorial_completed = false;
        flags.fishing_loop_tutorial_skipped = false;
        flags.fishing_loop_tutorial_replay_requested = true;
        self.commit();
        Ok(())
    }

    /// Consumes a pending replay request, if any.
    pub fn mark_fishing_loop_tutorial_started(&mut self) -> SaveResult<()> {
        self.ensure_writable()?;
        if !self.current.tutorial_flags.fishing_loop_tutorial_replay_requested {
            return Ok(());
        }
        self.current.tutorial_flags.fishing_loop_tutorial_replay_requested = false;
        self.commit();
        Ok(())
    }

    pub fn complete_fishing_loop_tutorial(&mut self, skipped: bool) -> SaveResult<()> {
        self.ensure_writable()?;
        let flags = &mut self.current.tutorial_flags;
        flags.fishing_loop_tutorial_completed = true;
        flags.fishing_loop_tutorial_skipped = skipped;
        flags.fishing_loop_tutorial_replay_requested = false;
        self.commit();
        Ok(())
    }

    /// Zeroes money, stats, progression and objective counters. Ownership,
    /// inventory and the catch log are kept.
    pub fn reset_profile_stats(&mut self) -> SaveResult<()> {
        self.ensure_writable()?;
        let first_step = self.config.level_xp_thresholds.get(1).copied().unwrap_or(0);
        let profile = &mut self.current;
        profile.copecs = 0;
        profile.stats = Default::default();

        let progression = &mut profile.progression;
        progression.total_xp = 0;
        progression.level = 1;
        progression.xp_into_level = 0;
        progression.xp_to_next_level = first_step;
        progression.unlocked_content_ids.clear();
        progression.last_unlock_id.clear();

        for entry in &mut profile.objective_progress.entries {
            entry.current_count = 0;
            entry.completed = false;
        }
        profile.objective_progress.completed_objectives = 0;

        info!("profile stats reset");
        self.commit();
        Ok(())
    }

    pub fn clear_fish_inventory(&mut self) -> SaveResult<()> {
        self.ensure_writable()?;
        if self.current.fish_inventory.is_empty() {
            return Ok(());
        }
        self.current.fish_inventory.clear();
        self.commit();
        Ok(())
    }

    /// Re-grants the starter ship and hook if either went missing.
    pub fn ensure_starter_ownership(&mut self) -> SaveResult<()> {
        self.ensure_writable()?;
        let mut changed = false;
        for (owned, starter) in [
            (&mut self.current.owned_ships, STARTER_SHIP_ID),
            (&mut self.current.owned_hooks, STARTER_HOOK_ID),
        ] {
            if !owned.iter().any(|id| id == starter) {
                owned.push(starter.to_string());
                changed = true;
            }
        }
        if changed {
            self.commit();
        }
        Ok(())
    }

    /// Records a landed fish: inventory, stats, XP and the catch log.
    ///
    /// Returns `None` for a blank fish id. Tiers below 1 count as tier 1.
    pub fn record_catch(
        &mut self,
        fish_id: &str,
        distance_tier: i32,
        weight_kg: f32,
        value_copecs: i64,
    ) -> SaveResult<Option<CatchOutcome>> {
        self.ensure_writable()?;
        if fish_id.trim().is_empty() {
            return Ok(None);
        }
        let tier = distance_tier.max(1);
        let value = value_copecs.max(0);

        let inventory = &mut self.current.fish_inventory;
        match inventory
            .iter()
            .position(|entry| entry.fish_id == fish_id && entry.distance_tier == tier)
        {
            Some(index) => {
                let entry = &mut inventory[index];
                entry.count = entry.count.saturating_add(1);
            }
            None => inventory.push(FishInventoryEntry {
                fish_id: fish_id.to_string(),
                distance_tier: tier,
                count: 1,
            }),
        }

        let stats = &mut self.current.stats;
        stats.total_fish_caught = stats.total_fish_caught.saturating_add(1);
        stats.farthest_distance_tier = stats.farthest_distance_tier.max(tier);
        stats.total_catch_value_copecs = stats.total_catch_value_copecs.saturating_add(value);

        let xp_earned = catch_xp(tier, weight_kg, value);
        let level_up = self.apply_xp(xp_earned);
        let entry = self.append_catch_log(fish_id, tier, true, weight_kg, value, "");

        debug!(fish_id, tier, xp = xp_earned, "catch recorded");
        self.commit();

        if let Some((previous, current)) = level_up {
            info!(previous, current, "level up");
            self.events
                .emit(&SaveEvent::LevelChanged { previous, current });
        }
        self.events.emit(&SaveEvent::CatchRecorded(entry.clone()));

        Ok(Some(CatchOutcome {
            entry,
            xp_earned,
            level_up,
        }))
    }

    /// Logs a fish that got away. Only the catch log changes.
    pub fn record_catch_failure(
        &mut self,
        fish_id: &str,
        distance_tier: i32,
        fail_reason: &str,
    ) -> SaveResult<CatchLogEntry> {
        self.ensure_writable()?;
        let entry =
            self.append_catch_log(fish_id, distance_tier.max(1), false, 0.0, 0, fail_reason);
        self.commit();
        Ok(entry)
    }

    /// Counts a purchase. With `save_after == false` the change is published
    /// but the write is left to the caller, e.g. when the purchase is part of
    /// a larger batch.
    pub fn record_purchase(
        &mut self,
        item_id: &str,
        price_copecs: i64,
        save_after: bool,
    ) -> SaveResult<()> {
        self.ensure_writable()?;
        if item_id.trim().is_empty() {
            return Ok(());
        }
        self.current.stats.total_purchases = self.current.stats.total_purchases.saturating_add(1);
        self.publish_change();
        if save_after {
            self.request_save();
        }
        self.events.emit(&SaveEvent::PurchaseRecorded {
            item_id: item_id.to_string(),
            price_copecs: price_copecs.max(0),
            total_purchases: self.current.stats.total_purchases.max(0),
        });
        Ok(())
    }

    /// The newest `max_entries` catch log entries, oldest first. At least one
    /// entry is returned when the log is not empty.
    pub fn recent_catch_log(&self, max_entries: usize) -> Vec<CatchLogEntry> {
        let log = &self.current.catch_log;
        let start = log.len().saturating_sub(max_entries.max(1));
        log[start..].to_vec()
    }

    pub fn next_unlock_description(&self) -> String {
        let unlocked = &self.current.progression.unlocked_content_ids;
        self.config
            .unlocks
            .iter()
            .find(|unlock| !unlocked.contains(&unlock.unlock_id))
            .map(|unlock| format!("Level {}: {}", unlock.level.max(1), unlock.label()))
            .unwrap_or_else(|| "All configured unlocks claimed".to_string())
    }

    /// Ids not governed by any unlock definition are always available.
    pub fn is_content_unlocked(&self, content_id: &str) -> bool {
        if content_id.trim().is_empty() {
            return false;
        }
        let tracked = self
            .config
            .unlocks
            .iter()
            .any(|unlock| unlock.unlock_id == content_id);
        !tracked
            || self
                .current
                .progression
                .unlocked_content_ids
                .iter()
                .any(|id| id == content_id)
    }

    /// Level at which `content_id` unlocks; 1 for untracked ids.
    pub fn unlock_level(&self, content_id: &str) -> i32 {
        self.config
            .unlocks
            .iter()
            .find(|unlock| unlock.unlock_id == content_id)
            .map_or(1, |unlock| unlock.level.max(1))
    }

    fn commit(&mut self) {
        self.publish_change();
        self.request_save();
    }

    fn apply_xp(&mut self, amount: i32) -> Option<(i32, i32)> {
        let previous = self.level();
        if amount <= 0 {
            return None;
        }
        let progression = &mut self.current.progression;
        progression.total_xp = progression.total_xp.saturating_add(amount).max(0);
        let progress = resolve_xp_progress(progression.total_xp, &self.config.level_xp_thresholds);
        progression.level = progress.level;
        progression.xp_into_level = progress.xp_into_level;
        progression.xp_to_next_level = progress.xp_to_next_level;

        if progress.level > previous {
            apply_unlocks(
                &mut self.current,
                &self.config.unlocks,
                previous.saturating_add(1),
                progress.level,
            );
            return Some((previous, progress.level));
        }
        None
    }

    fn append_catch_log(
        &mut self,
        fish_id: &str,
        distance_tier: i32,
        landed: bool,
        weight_kg: f32,
        value_copecs: i64,
        fail_reason: &str,
    ) -> CatchLogEntry {
        let entry = CatchLogEntry {
            fish_id: fish_id.to_string(),
            distance_tier: distance_tier.max(1),
            weight_kg: weight_kg.max(0.0),
            value_copecs: value_copecs.max(0),
            timestamp_utc: self
                .clock
                .utc_now()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            session_id: self.session_id.clone(),
            landed,
            fail_reason: fail_reason.to_string(),
        };
        self.current.catch_log.push(entry.clone());
        trim_catch_log(&mut self.current.catch_log, self.config.max_catch_log_entries);
        entry
    }
}
