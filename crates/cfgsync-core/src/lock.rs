//! Named mutual-exclusion locks guarding imports
//!
//! The importer holds [`IMPORT_LOCK`] for the whole time it mutates the
//! target store. Two backends are provided:
//!
//! - [`MemoryLock`] for a single process (and tests)
//! - [`FileLock`] for separate processes sharing a lock directory

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use fs2::FileExt;

use crate::{Error, Result};

/// Name of the lock held while an import is applied.
pub const IMPORT_LOCK: &str = "config_import";

/// A named lock.
pub trait Lock: Send + Sync {
    /// Take the lock without blocking. `false` when somebody else holds it.
    fn try_acquire(&self, name: &str) -> Result<bool>;

    /// Give the lock back. Releasing a lock that is not held is a no-op.
    fn release(&self, name: &str) -> Result<()>;

    /// Whether the lock is free right now. Never changes lock state.
    fn is_available(&self, name: &str) -> bool;
}

/// In-process lock. Clones share the same set of held names.
#[derive(Debug, Clone, Default)]
pub struct MemoryLock {
    held: Arc<Mutex<BTreeSet<String>>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lock for MemoryLock {
    fn try_acquire(&self, name: &str) -> Result<bool> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(held.insert(name.to_string()))
    }

    fn release(&self, name: &str) -> Result<()> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(name);
        Ok(())
    }

    fn is_available(&self, name: &str) -> bool {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        !held.contains(name)
    }
}

/// Advisory file lock, one `<name>.lock` file per lock in a directory.
///
/// The lock is an exclusive `flock` on the open file, so the operating
/// system drops it when the holding process exits, crashed or not. The file
/// itself is left in place. It records the holder's pid and acquisition time
/// while held and is emptied on release.
///
/// [`Lock::is_available`] trusts an empty file without touching the flock.
/// Only a non-empty file, left by a holder or by a crashed process, is
/// probed, and that probe can make a concurrent `try_acquire` lose.
#[derive(Debug)]
pub struct FileLock {
    dir: PathBuf,
    held: Mutex<HashMap<String, File>>,
}

impl FileLock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            held: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.lock"))
    }

    /// Contents of the lock file, describing the last holder.
    pub fn holder(&self, name: &str) -> Option<String> {
        let contents = fs::read_to_string(self.path(name)).ok()?;
        let contents = contents.trim();
        (!contents.is_empty()).then(|| contents.to_string())
    }

    fn open(&self, name: &str) -> std::io::Result<File> {
        fs::create_dir_all(&self.dir)?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path(name))
    }

    fn lock_error(&self, name: &str, error: impl std::fmt::Display) -> Error {
        Error::Lock {
            name: name.to_string(),
            message: format!("{}: {error}", self.path(name).display()),
        }
    }
}

fn is_contended(error: &std::io::Error) -> bool {
    error.kind() == fs2::lock_contended_error().kind()
}

fn clear(file: &File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.sync_all()
}

fn stamp(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "pid={}", std::process::id())?;
    writeln!(file, "acquired={}", chrono::Utc::now().to_rfc3339())?;
    file.sync_all()
}

impl Lock for FileLock {
    fn try_acquire(&self, name: &str) -> Result<bool> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.contains_key(name) {
            return Ok(false);
        }

        let mut file = self.open(name).map_err(|e| self.lock_error(name, e))?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if is_contended(&e) => {
                tracing::debug!(name, "Lock held by another process");
                return Ok(false);
            }
            Err(e) => return Err(self.lock_error(name, e)),
        }

        if let Err(e) = stamp(&mut file) {
            tracing::warn!(name, error = %e, "Failed to record lock holder");
        }
        tracing::debug!(name, path = %self.path(name).display(), "Acquired lock");
        held.insert(name.to_string(), file);
        Ok(true)
    }

    fn release(&self, name: &str) -> Result<()> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(file) = held.remove(name) else {
            return Ok(());
        };
        // Empty the file while still holding the lock, so nobody else's
        // stamp is wiped
        if let Err(e) = clear(&file) {
            tracing::warn!(name, error = %e, "Failed to clear lock holder");
        }
        // Closing the handle would drop the lock as well; unlock explicitly
        // so failures surface.
        FileExt::unlock(&file).map_err(|e| self.lock_error(name, e))?;
        tracing::debug!(name, "Released lock");
        Ok(())
    }

    fn is_available(&self, name: &str) -> bool {
        {
            let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
            if held.contains_key(name) {
                return false;
            }
        }

        let path = self.path(name);
        let Ok(mut file) = OpenOptions::new().read(true).open(&path) else {
            // No lock file means nobody ever locked it.
            return true;
        };
        let mut holder = String::new();
        if file.read_to_string(&mut holder).is_ok() && holder.trim().is_empty() {
            return true;
        }

        // A recorded holder may be stale after a crash
        match FileExt::try_lock_shared(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                true
            }
            Err(e) if is_contended(&e) => {
                tracing::debug!(name, holder = holder.trim(), "Lock is taken");
                false
            }
            Err(_) => false,
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let held = self.held.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (name, file) in held.drain() {
            let _ = clear(&file);
            if let Err(e) = FileExt::unlock(&file) {
                tracing::warn!(name, error = %e, "Failed to release lock on drop");
            }
        }
    }
}
