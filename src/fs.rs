//! Storage boundary for profile saves.
//!
//! [`SaveFileSystem`] is the only path through which the save manager
//! touches storage. [`DiskFileSystem`] talks to the real file system;
//! [`MemoryFileSystem`] keeps files in a map and can inject failures.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub trait SaveFileSystem {
    fn exists(&self, path: &Path) -> bool;

    /// Reads a whole file; a missing file yields [`io::ErrorKind::NotFound`].
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&mut self, path: &Path, contents: &str) -> io::Result<()>;

    fn remove(&mut self, path: &Path) -> io::Result<()>;

    fn rename(&mut self, source: &Path, destination: &Path) -> io::Result<()>;

    fn copy(&mut self, source: &Path, destination: &Path, overwrite: bool) -> io::Result<()>;

    /// Substitutes `source` for `destination`.
    ///
    /// When `destination` exists and `backup` is given, its content is copied
    /// to `backup` first. `source` no longer exists afterwards. On failure
    /// `destination` holds either its old or its new content in full.
    fn replace(
        &mut self,
        source: &Path,
        destination: &Path,
        backup: Option<&Path>,
    ) -> io::Result<()>;

    fn ensure_dir(&mut self, path: &Path) -> io::Result<()>;
}

/// Real file system. Staged writes are flushed to disk before returning so a
/// later rename publishes complete content.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskFileSystem;

impl SaveFileSystem for DiskFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&mut self, path: &Path, contents: &str) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }

    fn remove(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&mut self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::rename(source, destination)
    }

    fn copy(&mut self, source: &Path, destination: &Path, overwrite: bool) -> io::Result<()> {
        if !overwrite && destination.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", destination.display()),
            ));
        }
        fs::copy(source, destination).map(|_| ())
    }

    fn replace(
        &mut self,
        source: &Path,
        destination: &Path,
        backup: Option<&Path>,
    ) -> io::Result<()> {
        if !source.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("replace source missing: {}", source.display()),
            ));
        }
        if let Some(backup) = backup {
            if destination.is_file() {
                fs::copy(destination, backup)?;
            }
        }
        // rename(2) swaps the directory entry in one step, so readers see
        // either the old file or the new one.
        fs::rename(source, destination)
    }

    fn ensure_dir(&mut self, path: &Path) -> io::Result<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(path)
    }
}

/// Operations a [`MemoryFileSystem`] can be told to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FsOp {
    Read,
    Write,
    Remove,
    Rename,
    Copy,
    Replace,
    EnsureDir,
}

/// In-memory file system for tests and tooling.
#[derive(Clone, Debug, Default)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    copied_targets: Vec<PathBuf>,
    failing: BTreeMap<FsOp, io::ErrorKind>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    pub fn file(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Destinations of every successful [`SaveFileSystem::copy`], in order.
    pub fn copied_targets(&self) -> &[PathBuf] {
        &self.copied_targets
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    /// Makes every later `op` fail with `kind` until [`Self::heal`] is called.
    pub fn fail(&mut self, op: FsOp, kind: io::ErrorKind) {
        self.failing.insert(op, kind);
    }

    pub fn heal(&mut self, op: FsOp) {
        self.failing.remove(&op);
    }

    pub fn heal_all(&mut self) {
        self.failing.clear();
    }

    fn check(&self, op: FsOp, path: &Path) -> io::Result<()> {
        match self.failing.get(&op) {
            Some(kind) => Err(io::Error::new(
                *kind,
                format!("injected {op:?} failure on {}", path.display()),
            )),
            None => Ok(()),
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such file: {}", path.display()),
        )
    }
}

impl SaveFileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.check(FsOp::Read, path)?;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn write(&mut self, path: &Path, contents: &str) -> io::Result<()> {
        self.check(FsOp::Write, path)?;
        self.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> io::Result<()> {
        self.check(FsOp::Remove, path)?;
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(path))
    }

    fn rename(&mut self, source: &Path, destination: &Path) -> io::Result<()> {
        self.check(FsOp::Rename, source)?;
        let contents = self
            .files
            .remove(source)
            .ok_or_else(|| Self::not_found(source))?;
        self.files.insert(destination.to_path_buf(), contents);
        Ok(())
    }

    fn copy(&mut self, source: &Path, destination: &Path, overwrite: bool) -> io::Result<()> {
        self.check(FsOp::Copy, destination)?;
        let contents = self
            .files
            .get(source)
            .cloned()
            .ok_or_else(|| Self::not_found(source))?;
        if !overwrite && self.files.contains_key(destination) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", destination.display()),
            ));
        }
        self.files.insert(destination.to_path_buf(), contents);
        self.copied_targets.push(destination.to_path_buf());
        Ok(())
    }

    fn replace(
        &mut self,
        source: &Path,
        destination: &Path,
        backup: Option<&Path>,
    ) -> io::Result<()> {
        self.check(FsOp::Replace, destination)?;
        let contents = self
            .files
            .get(source)
            .cloned()
            .ok_or_else(|| Self::not_found(source))?;
        if let (Some(backup), Some(previous)) = (backup, self.files.get(destination).cloned()) {
            self.files.insert(backup.to_path_buf(), previous);
        }
        self.files.insert(destination.to_path_buf(), contents);
        self.files.remove(source);
        Ok(())
    }

    fn ensure_dir(&mut self, path: &Path) -> io::Result<()> {
        self.check(FsOp::EnsureDir, path)?;
        self.dirs.insert(path.to_path_buf());
        Ok(())
    }
}

/// Appends `suffix` to the full file name (`save.json` + `.bak` →
/// `save.json.bak`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut output = path.as_os_str().to_os_string();
    output.push(suffix);
    PathBuf::from(output)
}

#[cfg(test)]
#[path = "tests/fs_tests.rs"]
mod tests;
