use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fishing_save::{
    prepare_for_load, with_suffix, DiskFileSystem, MigrationReport, SaveDataV1, SaveFileSystem,
    BACKUP_FILE_SUFFIX, CORRUPT_FILE_MARKER, TEMP_FILE_SUFFIX,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Fishing profile save tool")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report version, migration outcome and digest of a save file.
    Inspect {
        save: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Migrate a save file to the current schema version.
    Migrate {
        save: PathBuf,
        #[arg(short, long, conflicts_with = "in_place")]
        output: Option<PathBuf>,
        /// Replace the file, keeping the original next to it as `.bak`.
        #[arg(long, default_value_t = false)]
        in_place: bool,
    },
    /// List forensic copies of unreadable saves in a directory.
    Backups { dir: PathBuf },
}

#[derive(Serialize)]
struct InspectReport {
    path: String,
    sha256: String,
    size: u64,
    migration: MigrationReport,
    summary: Option<ProfileSummary>,
}

#[derive(Serialize)]
struct ProfileSummary {
    copecs: i64,
    level: i32,
    total_xp: i32,
    total_fish_caught: i32,
    total_trips: i32,
    owned_ships: usize,
    owned_hooks: usize,
    career_start: String,
}

impl From<&SaveDataV1> for ProfileSummary {
    fn from(save: &SaveDataV1) -> Self {
        Self {
            copecs: save.copecs,
            level: save.progression.level,
            total_xp: save.progression.total_xp,
            total_fish_caught: save.stats.total_fish_caught,
            total_trips: save.stats.total_trips,
            owned_ships: save.owned_ships.len(),
            owned_hooks: save.owned_hooks.len(),
            career_start: save.career_start_local_date.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct BackupEntry {
    name: String,
    stamp: String,
    size: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Inspect { save, json } => inspect(&save, json),
        Command::Migrate {
            save,
            output,
            in_place,
        } => migrate(&save, output.as_deref(), in_place),
        Command::Backups { dir } => list_backups(&dir),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn inspect(path: &Path, as_json: bool) -> Result<()> {
    let report = build_inspect_report(path)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let migration = &report.migration;
    println!("file:     {}", report.path);
    println!("sha256:   {}", report.sha256);
    println!("size:     {} bytes", report.size);
    println!(
        "version:  {} ({:?})",
        migration.source_version, migration.version_source
    );
    match &migration.failure_reason {
        Some(reason) => println!("status:   unusable: {reason}"),
        None if migration.was_migrated => println!(
            "status:   loads after {}",
            migration.applied_steps.join(", ")
        ),
        None => println!("status:   current"),
    }
    if let Some(summary) = &report.summary {
        println!(
            "profile:  level {} ({} xp), {} copecs, {} fish over {} trips",
            summary.level,
            summary.total_xp,
            summary.copecs,
            summary.total_fish_caught,
            summary.total_trips
        );
    }
    Ok(())
}

fn build_inspect_report(path: &Path) -> Result<InspectReport> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let raw = String::from_utf8_lossy(&bytes);
    let (migration, summary) = match prepare_for_load(&raw) {
        Ok(prepared) => {
            let summary = serde_json::from_str::<SaveDataV1>(&prepared.json)
                .map(|save| ProfileSummary::from(&save))
                .ok();
            (prepared.report, summary)
        }
        Err(failure) => (failure.report, None),
    };
    Ok(InspectReport {
        path: path.display().to_string(),
        sha256: sha256_hex(&bytes),
        size: bytes.len() as u64,
        migration,
        summary,
    })
}

fn migrate(path: &Path, output: Option<&Path>, in_place: bool) -> Result<()> {
    if output.is_none() && !in_place {
        bail!("pass --output <file> or --in-place");
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let prepared = match prepare_for_load(&raw) {
        Ok(prepared) => prepared,
        Err(failure) => bail!("{}: {}", path.display(), failure.error),
    };
    let report = &prepared.report;
    if report.was_migrated {
        info!(
            from = report.source_version,
            to = report.final_version,
            steps = ?report.applied_steps,
            "migrated"
        );
    } else {
        info!(version = report.final_version, "already current");
    }

    match output {
        Some(target) => {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, &prepared.json)
                .with_context(|| format!("write {}", target.display()))?;
            println!("wrote {}", target.display());
        }
        None => {
            if !report.was_migrated {
                println!("{} is already current; left untouched", path.display());
                return Ok(());
            }
            let backup = replace_in_place(path, &prepared.json)?;
            println!("migrated {} (original kept at {})", path.display(), backup.display());
        }
    }
    Ok(())
}

/// Swaps `json` into `path` through a staging file and keeps the previous
/// content as `<path>.bak`.
fn replace_in_place(path: &Path, json: &str) -> Result<PathBuf> {
    let mut disk = DiskFileSystem;
    let staging = with_suffix(path, TEMP_FILE_SUFFIX);
    let backup = with_suffix(path, BACKUP_FILE_SUFFIX);
    if disk.exists(&backup) {
        warn!(backup = %backup.display(), "overwriting previous backup");
    }
    disk.write(&staging, json)
        .with_context(|| format!("write {}", staging.display()))?;
    if let Err(err) = disk.replace(&staging, path, Some(&backup)) {
        if let Err(cleanup) = disk.remove(&staging) {
            warn!(path = %staging.display(), error = %cleanup, "failed to remove staging file");
        }
        return Err(err).with_context(|| format!("replace {}", path.display()));
    }
    Ok(backup)
}

fn list_backups(dir: &Path) -> Result<()> {
    let entries = collect_backups(dir)?;
    if entries.is_empty() {
        println!("no corrupt-save backups in {}", dir.display());
        return Ok(());
    }
    for entry in &entries {
        println!("{}  {:>8} bytes  {}", entry.stamp, entry.size, entry.name);
    }
    Ok(())
}

fn collect_backups(dir: &Path) -> Result<Vec<BackupEntry>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some((_, stamp)) = name.split_once(CORRUPT_FILE_MARKER) else {
            continue;
        };
        let size = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
        entries.push(BackupEntry {
            stamp: stamp.to_string(),
            name,
            size,
        });
    }
    // the UTC stamp sorts lexically
    entries.sort_by(|left, right| left.stamp.cmp(&right.stamp));
    Ok(entries)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
