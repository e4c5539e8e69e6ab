use super::*;

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::clock::ManualClock;
use crate::config::SaveConfig;
use crate::fs::{FsOp, MemoryFileSystem};

const SAVE_PATH: &str = "/saves/save_v1.json";

type TestManager<'a> = SaveManager<MemoryFileSystem, &'a ManualClock>;

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap())
}

fn config() -> ResolvedSaveConfig {
    SaveConfig::in_dir("/saves").resolve()
}

fn manager_with(fs: MemoryFileSystem, clock: &ManualClock) -> TestManager<'_> {
    SaveManager::new(config(), fs, clock)
}

fn loaded(clock: &ManualClock) -> TestManager<'_> {
    let mut manager = manager_with(MemoryFileSystem::new(), clock);
    manager.load_or_create().expect("fresh load");
    manager
}

fn stored(manager: &TestManager<'_>) -> SaveDataV1 {
    let text = manager
        .file_system()
        .file(Path::new(SAVE_PATH))
        .expect("save file present");
    serde_json::from_str(text).expect("stored profile parses")
}

fn corrupt_copies(manager: &TestManager<'_>) -> Vec<PathBuf> {
    manager
        .file_system()
        .paths()
        .filter(|path| path.to_string_lossy().contains(".corrupt_"))
        .map(Path::to_path_buf)
        .collect()
}

fn record_events(manager: &mut TestManager<'_>) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    manager.subscribe(move |event| sink.borrow_mut().push(event.name().to_string()));
    seen
}

#[test]
fn missing_file_creates_and_persists_default() {
    let clock = clock();
    let mut manager = manager_with(MemoryFileSystem::new(), &clock);

    let report = manager.load_or_create().expect("load");
    assert_eq!(report.outcome, LoadOutcome::CreatedNew);
    assert!(report.persisted);
    assert_eq!(manager.phase(), LoadPhase::Ready);
    assert!(manager.file_system().has_dir(Path::new("/saves")));

    let saved = stored(&manager);
    assert_eq!(saved.save_version, 1);
    assert_eq!(saved.career_start_local_date, "2026-03-14");
    assert_eq!(saved.last_login_local_date, "2026-03-14");
    assert_eq!(saved.equipped_ship_id, "ship_lv1");
    assert_eq!(saved.progression.xp_to_next_level, 100);

    let paths: Vec<&Path> = manager.file_system().paths().collect();
    assert_eq!(paths, vec![Path::new(SAVE_PATH)]);
}

#[test]
fn corrupt_file_is_backed_up_once_and_replaced_by_default() {
    let clock = clock();
    let fs = MemoryFileSystem::new().with_file(SAVE_PATH, "{bad-json");
    let mut manager = manager_with(fs, &clock);

    let report = manager.load_or_create().expect("load recovers");
    match &report.outcome {
        LoadOutcome::RecoveredWithDefault { reason } => {
            assert!(reason.starts_with("parse error: "), "reason: {reason}")
        }
        other => panic!("expected recovery, got {other:?}"),
    }
    assert_eq!(manager.phase(), LoadPhase::DefaultApplied);

    let copies = corrupt_copies(&manager);
    assert_eq!(copies.len(), 1);
    assert_eq!(
        copies[0],
        PathBuf::from("/saves/save_v1.json.corrupt_20260314_093000")
    );
    assert_eq!(report.backup_path.as_ref(), Some(&copies[0]));
    assert_eq!(
        manager.file_system().file(&copies[0]),
        Some("{bad-json")
    );

    let saved = stored(&manager);
    assert_eq!(saved.copecs, 0);
    assert_eq!(saved.save_version, 1);
}

#[test]
fn legacy_file_failing_its_step_is_backed_up_and_replaced() {
    let clock = clock();
    let original = r#"{"copecs":"lots"}"#;
    let fs = MemoryFileSystem::new().with_file(SAVE_PATH, original);
    let mut manager = manager_with(fs, &clock);

    let report = manager.load_or_create().expect("load recovers");
    match &report.outcome {
        LoadOutcome::RecoveredWithDefault { reason } => {
            assert!(reason.contains("v0->v1"), "reason: {reason}")
        }
        other => panic!("expected recovery, got {other:?}"),
    }
    assert_eq!(manager.phase(), LoadPhase::DefaultApplied);

    let migration = report.migration.as_ref().expect("migration report");
    assert_eq!(migration.source_version, 0);
    assert!(migration.failure_reason.is_some());

    let copies = corrupt_copies(&manager);
    assert_eq!(copies.len(), 1);
    assert_eq!(manager.file_system().file(&copies[0]), Some(original));
    assert_eq!(stored(&manager).copecs, 0);
}

#[test]
fn counters_saturate_instead_of_overflowing() {
    let clock = clock();
    let raw = format!(
        r#"{{"saveVersion":1,"stats":{{"totalTrips":{max},"totalFishCaught":{max},"totalPurchases":{max}}},"fishInventory":[{{"fishId":"fish_cod","distanceTier":1,"count":{max}}}]}}"#,
        max = i32::MAX
    );
    let fs = MemoryFileSystem::new().with_file(SAVE_PATH, raw);
    let mut manager = manager_with(fs, &clock);
    manager.load_or_create().expect("load");

    manager.mark_trip_completed().expect("trip");
    manager
        .record_catch("fish_cod", 1, 1.0, 10)
        .expect("catch")
        .expect("landed");
    manager
        .record_catch("fish_pike", i32::MAX, 1.0, 10)
        .expect("far catch")
        .expect("landed");
    manager.record_purchase("hook_lv2", 50, false).expect("purchase");

    let current = manager.current();
    assert_eq!(current.stats.total_trips, i32::MAX);
    assert_eq!(current.stats.total_fish_caught, i32::MAX);
    assert_eq!(current.stats.total_purchases, i32::MAX);
    assert_eq!(current.fish_inventory[0].count, i32::MAX);
    assert_eq!(current.stats.farthest_distance_tier, i32::MAX);
}

#[test]
fn failed_backup_blocks_writes_and_keeps_file() {
    let clock = clock();
    let mut fs = MemoryFileSystem::new().with_file(SAVE_PATH, "{bad-json");
    fs.fail(FsOp::Copy, io::ErrorKind::PermissionDenied);
    let mut manager = manager_with(fs, &clock);

    let err = manager.load_or_create().expect_err("backup failure surfaces");
    assert!(matches!(err, SaveError::Io { .. }));
    assert_eq!(manager.phase(), LoadPhase::Rejected);
    assert_eq!(
        manager.file_system().file(Path::new(SAVE_PATH)),
        Some("{bad-json")
    );
    assert!(matches!(
        manager.add_copecs(5),
        Err(SaveError::WritesBlocked(_))
    ));
}

#[test]
fn legacy_file_is_migrated_and_persisted() {
    let clock = clock();
    let legacy = r#"{"copecs":120,"ownedShips":["ship_lv1"],"stats":{"totalTrips":4}}"#;
    let fs = MemoryFileSystem::new().with_file(SAVE_PATH, legacy);
    let mut manager = manager_with(fs, &clock);

    let report = manager.load_or_create().expect("migrates");
    assert_eq!(report.outcome, LoadOutcome::Migrated);
    assert!(report.persisted);
    let migration = report.migration.expect("migration report");
    assert_eq!(migration.applied_steps, vec!["v0->v1".to_string()]);

    let saved = stored(&manager);
    assert_eq!(saved.save_version, 1);
    assert_eq!(saved.copecs, 120);
    assert_eq!(saved.stats.total_trips, 4);
    assert!(corrupt_copies(&manager).is_empty());
}

#[test]
fn current_file_round_trips() {
    let clock = clock();
    let json = r#"{"saveVersion":1,"copecs":250,"ownedShips":["ship_lv1","ship_lv2"],"fishInventory":[{"fishId":"fish_cod","distanceTier":2,"count":3}]}"#;
    let fs = MemoryFileSystem::new().with_file(SAVE_PATH, json);
    let mut manager = manager_with(fs, &clock);

    let report = manager.load_or_create().expect("loads");
    assert_eq!(report.outcome, LoadOutcome::LoadedCurrent);
    assert!(!report.migration.expect("report").was_migrated);

    let current = manager.current();
    assert_eq!(current.copecs, 250);
    assert_eq!(current.owned_ships, vec!["ship_lv1", "ship_lv2"]);
    assert_eq!(current.fish_inventory[0].count, 3);
    assert_eq!(stored(&manager), *manager.current());
}

#[test]
fn newer_version_is_rejected_and_left_untouched() {
    let clock = clock();
    let future = r#"{"saveVersion":99,"copecs":10}"#;
    let fs = MemoryFileSystem::new().with_file(SAVE_PATH, future);
    let mut manager = manager_with(fs, &clock);

    let err = manager.load_or_create().expect_err("newer file rejected");
    assert!(matches!(
        err,
        SaveError::UnsupportedVersion {
            found: 99,
            supported: 1
        }
    ));
    assert_eq!(manager.phase(), LoadPhase::Rejected);
    assert!(manager
        .blocked_reason()
        .expect("reason")
        .contains("newer than supported"));

    assert!(matches!(
        manager.add_copecs(5),
        Err(SaveError::WritesBlocked(_))
    ));
    assert!(matches!(manager.save(true), Err(SaveError::WritesBlocked(_))));
    assert_eq!(manager.shutdown().expect("shutdown"), SaveOutcome::Idle);

    assert_eq!(manager.file_system().file(Path::new(SAVE_PATH)), Some(future));
    assert!(manager.file_system().copied_targets().is_empty());
}

#[test]
fn mutations_before_load_are_refused() {
    let clock = clock();
    let mut manager = manager_with(MemoryFileSystem::new(), &clock);
    assert!(matches!(manager.add_copecs(1), Err(SaveError::NotLoaded)));
    assert_eq!(manager.flush_pending().expect("flush"), SaveOutcome::Idle);
    assert_eq!(manager.shutdown().expect("shutdown"), SaveOutcome::Idle);
}

#[test]
fn writes_inside_interval_are_deferred_until_flush() {
    let clock = clock();
    let mut manager = loaded(&clock);

    clock.advance(0.25);
    manager.add_copecs(5).expect("mutate");
    assert_eq!(manager.current().copecs, 5);
    assert!(manager.has_pending_write());
    assert_eq!(stored(&manager).copecs, 0);

    assert_eq!(manager.flush_pending().expect("flush"), SaveOutcome::Idle);

    clock.advance(0.8);
    assert_eq!(manager.flush_pending().expect("flush"), SaveOutcome::Persisted);
    assert!(!manager.has_pending_write());
    assert_eq!(stored(&manager).copecs, 5);
}

#[test]
fn shutdown_forces_pending_write() {
    let clock = clock();
    let mut manager = loaded(&clock);

    clock.advance(0.1);
    manager.add_copecs(7).expect("mutate");
    assert_eq!(stored(&manager).copecs, 0);

    assert_eq!(manager.shutdown().expect("shutdown"), SaveOutcome::Persisted);
    assert_eq!(stored(&manager).copecs, 7);
}

#[test]
fn failed_write_stays_pending_and_retries() {
    let clock = clock();
    let mut manager = loaded(&clock);
    clock.advance(2.0);

    manager
        .file_system_mut()
        .fail(FsOp::Write, io::ErrorKind::PermissionDenied);
    manager.add_copecs(10).expect("in-memory change still applies");
    assert!(manager.has_pending_write());
    assert_eq!(manager.consecutive_write_failures(), 1);
    assert_eq!(stored(&manager).copecs, 0);

    let err = manager.save(true).expect_err("forced save fails");
    assert!(matches!(err, SaveError::Io { .. }));
    assert_eq!(manager.consecutive_write_failures(), 2);

    manager.file_system_mut().heal_all();
    assert_eq!(manager.flush_pending().expect("retry"), SaveOutcome::Persisted);
    assert_eq!(manager.consecutive_write_failures(), 0);
    assert_eq!(stored(&manager).copecs, 10);
}

#[test]
fn failed_replace_keeps_last_good_file() {
    let clock = clock();
    let mut manager = loaded(&clock);
    manager.add_copecs(3).expect("mutate");
    manager.save(true).expect("persist copecs");

    manager
        .file_system_mut()
        .fail(FsOp::Replace, io::ErrorKind::Other);
    manager.add_copecs(4).expect("mutate");
    assert!(manager.save(true).is_err());

    assert_eq!(stored(&manager).copecs, 3);
    let fs = manager.file_system();
    assert!(!fs.exists(Path::new("/saves/save_v1.json.tmp")));
    assert!(!fs.exists(Path::new("/saves/save_v1.json.bak")));
}

#[test]
fn mutations_publish_data_changed_with_increasing_revisions() {
    let clock = clock();
    let mut manager = manager_with(MemoryFileSystem::new(), &clock);
    let revisions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&revisions);
    manager.subscribe(move |event| {
        if let SaveEvent::DataChanged { revision, snapshot } = event {
            sink.borrow_mut().push((*revision, snapshot.copecs));
        }
    });

    manager.load_or_create().expect("load");
    manager.add_copecs(20).expect("mutate");
    manager.add_copecs(0).expect("ignored");
    manager
        .mutate(|profile| profile.copecs += 1)
        .expect("generic mutate");

    assert_eq!(*revisions.borrow(), vec![(1, 0), (2, 20), (3, 21)]);
    assert_eq!(manager.revision(), 3);
}

#[test]
fn catch_grants_xp_levels_and_unlocks() {
    let clock = clock();
    let mut manager = loaded(&clock);
    let events = record_events(&mut manager);

    let outcome = manager
        .record_catch("fish_pike", 3, 10.0, 2500)
        .expect("record")
        .expect("landed");
    assert_eq!(outcome.xp_earned, 150);
    assert_eq!(outcome.level_up, Some((1, 2)));
    assert_eq!(outcome.entry.timestamp_utc, "2026-03-14T09:30:00.000Z");
    assert_eq!(outcome.entry.session_id, manager.session_id());
    assert_eq!(manager.session_id().len(), 32);

    let current = manager.current();
    assert_eq!(current.stats.total_fish_caught, 1);
    assert_eq!(current.stats.farthest_distance_tier, 3);
    assert_eq!(current.stats.total_catch_value_copecs, 2500);
    assert_eq!(current.progression.level, 2);
    assert_eq!(current.progression.xp_into_level, 50);
    assert_eq!(current.progression.last_unlock_id, "hook_lv2");
    assert!(current.owned_hooks.contains(&"hook_lv2".to_string()));
    assert!(manager.is_content_unlocked("hook_lv2"));
    assert_eq!(manager.next_unlock_description(), "Level 3: Ship Lv2");

    assert_eq!(
        *events.borrow(),
        vec!["data_changed", "level_changed", "catch_recorded"]
    );

    manager
        .record_catch("fish_pike", 3, 0.5, 10)
        .expect("second catch");
    assert_eq!(manager.current().fish_inventory.len(), 1);
    assert_eq!(manager.current().fish_inventory[0].count, 2);
    assert!(manager.record_catch("  ", 1, 1.0, 1).expect("blank").is_none());
}

#[test]
fn catch_log_is_trimmed_to_configured_size() {
    let clock = clock();
    let config = SaveConfig {
        max_catch_log_entries: 3,
        ..SaveConfig::in_dir("/saves")
    }
    .resolve();
    let mut manager = SaveManager::new(config, MemoryFileSystem::new(), &clock);
    manager.load_or_create().expect("load");

    for index in 0..5 {
        manager
            .record_catch_failure(&format!("fish_{index}"), 0, "line_snapped")
            .expect("failure logged");
    }

    let log = &manager.current().catch_log;
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].fish_id, "fish_2");
    assert!(!log[0].landed);
    assert_eq!(log[0].distance_tier, 1);
    assert_eq!(log[0].fail_reason, "line_snapped");

    let recent = manager.recent_catch_log(2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1].fish_id, "fish_4");
    assert_eq!(manager.recent_catch_log(0).len(), 1);
}

#[test]
fn load_normalizes_progression_and_ownership() {
    let clock = clock();
    let json = r#"{"saveVersion":1,"ownedShips":[],"equippedShipId":"","progression":{"totalXp":300},"careerStartLocalDate":"2026-03-01"}"#;
    let fs = MemoryFileSystem::new().with_file(SAVE_PATH, json);
    let mut manager = manager_with(fs, &clock);
    manager.load_or_create().expect("load");

    let current = manager.current();
    assert_eq!(current.progression.level, 3);
    assert_eq!(current.owned_ships, vec!["ship_lv1", "ship_lv2"]);
    assert_eq!(current.equipped_ship_id, "ship_lv1");
    assert!(current.owned_hooks.contains(&"hook_lv2".to_string()));
    assert_eq!(
        current.progression.unlocked_content_ids,
        vec!["hook_lv2", "ship_lv2"]
    );
    assert_eq!(current.last_login_local_date, "2026-03-14");
    assert_eq!(manager.day_number(), 14);
}

#[test]
fn unlock_queries_follow_configuration() {
    let clock = clock();
    let manager = loaded(&clock);

    assert_eq!(manager.next_unlock_description(), "Level 2: Hook Lv2");
    assert!(!manager.is_content_unlocked("hook_lv2"));
    assert!(manager.is_content_unlocked("harbor_backdrop"));
    assert!(!manager.is_content_unlocked(""));
    assert_eq!(manager.unlock_level("ship_lv3"), 5);
    assert_eq!(manager.unlock_level("harbor_backdrop"), 1);
}

#[test]
fn fishing_loop_tutorial_flags() {
    let clock = clock();
    let mut manager = loaded(&clock);
    assert!(manager.should_run_fishing_loop_tutorial());

    manager.complete_fishing_loop_tutorial(true).expect("complete");
    assert!(!manager.should_run_fishing_loop_tutorial());
    assert!(manager.current().tutorial_flags.fishing_loop_tutorial_skipped);

    manager.request_fishing_loop_tutorial_replay().expect("replay");
    assert!(manager.should_run_fishing_loop_tutorial());
    assert!(!manager.current().tutorial_flags.fishing_loop_tutorial_skipped);

    let revision = manager.revision();
    manager.mark_fishing_loop_tutorial_started().expect("start");
    assert!(!manager.current().tutorial_flags.fishing_loop_tutorial_replay_requested);
    manager.mark_fishing_loop_tutorial_started().expect("no-op");
    assert_eq!(manager.revision(), revision + 1);

    manager.set_tutorial_seen(true).expect("seen");
    assert!(manager.current().tutorial_flags.tutorial_seen);
}

#[test]
fn reset_profile_stats_clears_progress_but_keeps_ownership() {
    let clock = clock();
    let mut manager = loaded(&clock);
    manager.add_copecs(500).expect("copecs");
    manager.mark_trip_completed().expect("trip");
    manager
        .record_catch("fish_pike", 3, 10.0, 2500)
        .expect("catch");
    manager.mutate(|profile| {
        profile
            .objective_progress
            .entries
            .push(crate::schema::ObjectiveProgressEntry {
                id: "catch_3".to_string(),
                current_count: 3,
                target_count: 3,
                completed: true,
                ..Default::default()
            });
        profile.objective_progress.completed_objectives = 1;
    })
    .expect("objective");

    manager.reset_profile_stats().expect("reset");
    let current = manager.current();
    assert_eq!(current.copecs, 0);
    assert_eq!(current.stats, crate::schema::SaveStats::default());
    assert_eq!(current.progression.level, 1);
    assert_eq!(current.progression.xp_to_next_level, 100);
    assert!(current.progression.unlocked_content_ids.is_empty());
    assert_eq!(current.objective_progress.completed_objectives, 0);
    assert!(!current.objective_progress.entries[0].completed);
    assert!(current.owned_hooks.contains(&"hook_lv2".to_string()));
    assert_eq!(current.fish_inventory.len(), 1);
}

#[test]
fn trip_purchase_and_inventory_helpers() {
    let clock = clock();
    let mut manager = loaded(&clock);
    let events = record_events(&mut manager);

    manager.mark_trip_completed().expect("trip");
    assert_eq!(manager.current().stats.total_trips, 1);

    clock.advance(5.0);
    manager
        .record_purchase("hook_lv2", 150, false)
        .expect("purchase");
    assert_eq!(manager.current().stats.total_purchases, 1);
    assert_eq!(stored(&manager).stats.total_purchases, 0);
    manager.record_purchase("", 10, true).expect("blank ignored");

    manager
        .record_catch("fish_cod", 1, 1.0, 10)
        .expect("catch");
    manager.clear_fish_inventory().expect("clear");
    assert!(manager.current().fish_inventory.is_empty());

    manager.mutate(|profile| profile.owned_hooks.clear()).expect("drop hooks");
    manager.ensure_starter_ownership().expect("starter");
    assert_eq!(manager.current().owned_hooks, vec!["hook_lv1"]);

    let seen = events.borrow();
    assert_eq!(seen[0], "data_changed");
    assert_eq!(seen[1], "trip_completed");
    assert_eq!(seen[2], "data_changed");
    assert_eq!(seen[3], "purchase_recorded");
}

#[test]
fn day_number_uses_local_date() {
    let clock = clock();
    let manager = loaded(&clock);
    assert_eq!(manager.day_number(), 1);
    clock.set_today(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap());
    assert_eq!(manager.day_number(), 7);
}
