//! Safe JSON document storage.
//!
//! Every document lives at a stable path. Writes go to a `<name>.tmp` sibling which is
//! flushed, fsynced and renamed over the canonical path, so a reader never observes a
//! half-written file. Before each overwrite the previous content is copied to
//! `<name>.bak`; `load` falls back to that copy when the primary no longer parses.
//!
//! Calls against the same path are serialized by a per-path `RwLock` owned by the
//! store (loads share, saves exclude). Advisory OS locks via `fs2` are taken on top
//! when enabled, but correctness never depends on them.

mod async_wrappers;
mod file_lock;

#[cfg(test)]
mod tests;

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arcadia_types::StorageError;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use file_lock::FileLockGuard;

const BACKUP_SUFFIX: &str = "bak";
const TEMP_SUFFIX: &str = "tmp";

/// Whether to take advisory OS-level locks in addition to the in-process lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileLocking {
    /// `flock`/`LockFileEx` via fs2, failures ignored
    #[default]
    Advisory,
    /// In-process lock only
    Disabled,
}

/// Concurrency-safe whole-file JSON store.
///
/// Cloning is cheap; clones share the same lock registry.
#[derive(Debug, Clone, Default)]
pub struct JsonStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    locks: DashMap<PathBuf, Arc<RwLock<()>>>,
    locking: FileLocking,
}

/// `<file>.bak` next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, BACKUP_SUFFIX)
}

/// `<file>.tmp` next to `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, TEMP_SUFFIX)
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Per-path lock. The registry entry is dropped once no caller holds it, so the
/// registry only ever holds paths in use.
struct PathLock<'a> {
    locks: &'a DashMap<PathBuf, Arc<RwLock<()>>>,
    key: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl Deref for PathLock<'_> {
    type Target = RwLock<()>;

    fn deref(&self) -> &RwLock<()> {
        &self.lock
    }
}

impl Drop for PathLock<'_> {
    fn drop(&mut self) {
        // Two owners left means the registry and this guard.
        self.locks.remove_if(&self.key, |_, lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2);
    }
}

fn absolute_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl JsonStore {
    pub fn new() -> Self {
        Self::with_locking(FileLocking::Advisory)
    }

    pub fn with_locking(locking: FileLocking) -> Self {
        Self { inner: Arc::new(StoreInner { locks: DashMap::new(), locking }) }
    }

    /// Paths with a load or save in progress.
    pub fn tracked_paths(&self) -> usize {
        self.inner.locks.len()
    }

    fn lock_for(&self, path: &Path) -> PathLock<'_> {
        let key = absolute_key(path);
        let lock = self.inner.locks.entry(key.clone()).or_insert_with(|| Arc::new(RwLock::new(()))).clone();
        PathLock { locks: &self.inner.locks, key, lock }
    }

    fn advisory(&self) -> bool {
        self.inner.locking == FileLocking::Advisory
    }

    /// Load `path`, degrading to `default` when the file is absent or unreadable.
    ///
    /// A primary that fails to parse is replaced by its `.bak` copy when that parses.
    /// Never creates the file.
    pub fn load<T: DeserializeOwned>(&self, path: impl AsRef<Path>, default: T) -> T {
        self.load_existing(path.as_ref()).unwrap_or(default)
    }

    pub(crate) fn load_existing<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let lock = self.lock_for(path);
        let _guard = lock.read();

        if !path.exists() {
            debug!(path = %path.display(), "Document does not exist, using default");
            return None;
        }

        match self.read_document(path) {
            Ok(value) => {
                debug!(path = %path.display(), "Loaded document");
                Some(value)
            },
            Err(StorageError::Json { message, .. }) => {
                error!(path = %path.display(), error = %message, "JSON decode error");
                self.load_backup(path)
            },
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load document");
                None
            },
        }
    }

    fn load_backup<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let backup = backup_path(path);
        if !backup.exists() {
            return None;
        }
        warn!(backup = %backup.display(), "Attempting to load backup");
        match self.read_document(&backup) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(backup = %backup.display(), error = %e, "Backup is unusable as well");
                None
            },
        }
    }

    fn read_document<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StorageError> {
        let file = File::open(path).map_err(|e| StorageError::io(path, &e))?;
        let _os_lock = self.advisory().then(|| FileLockGuard::shared(&file));

        let mut content = String::new();
        (&file).read_to_string(&mut content).map_err(|e| StorageError::io(path, &e))?;
        serde_json::from_str(&content).map_err(|e| StorageError::json(path, &e))
    }

    /// Atomically replace `path` with `value` serialized as pretty JSON.
    ///
    /// Returns `false` (and leaves no temp file behind) on any failure.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_save(value, path) {
            Ok(()) => {
                debug!(path = %path.display(), "Saved document");
                true
            },
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to save document");
                false
            },
        }
    }

    /// Like [`JsonStore::save`] but reports why a save failed.
    pub fn try_save<T: Serialize + ?Sized>(
        &self,
        value: &T,
        path: &Path,
    ) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(value).map_err(|e| StorageError::json(path, &e))?;

        let lock = self.lock_for(path);
        let _guard = lock.write();

        if path.exists() {
            let backup = backup_path(path);
            if let Err(e) = fs::copy(path, &backup) {
                warn!(path = %path.display(), error = %e, "Could not create backup");
            }
        } else if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, &e))?;
        }

        let temp = temp_path(path);
        let result = self
            .write_temp(&temp, &body)
            .and_then(|()| fs::rename(&temp, path).map_err(|e| StorageError::io(path, &e)));

        match result {
            Ok(()) => {
                sync_parent_dir(path);
                Ok(())
            },
            Err(e) => {
                if temp.exists() {
                    let _ = fs::remove_file(&temp);
                }
                Err(e)
            },
        }
    }

    fn write_temp(&self, temp: &Path, body: &[u8]) -> Result<(), StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp)
            .map_err(|e| StorageError::io(temp, &e))?;
        let _os_lock = self.advisory().then(|| FileLockGuard::exclusive(&file));

        let mut writer = &file;
        writer.write_all(body).map_err(|e| StorageError::io(temp, &e))?;
        writer.flush().map_err(|e| StorageError::io(temp, &e))?;
        file.sync_all().map_err(|e| StorageError::io(temp, &e))
    }
}

/// Persist the rename itself. Directories cannot be opened for sync on Windows.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
