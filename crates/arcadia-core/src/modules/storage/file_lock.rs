//! Advisory OS file locks.
//!
//! Best-effort: a platform or filesystem that refuses the lock only produces a debug
//! line. The store's in-process lock is what keeps callers apart.

use std::fs::File;

use fs2::FileExt;
use tracing::debug;

pub(super) struct FileLockGuard<'a> {
    file: &'a File,
    held: bool,
}

impl<'a> FileLockGuard<'a> {
    pub(super) fn shared(file: &'a File) -> Self {
        let held = FileExt::try_lock_shared(file).is_ok()
            || FileExt::lock_shared(file)
                .map_err(|e| debug!(error = %e, "Shared lock unavailable"))
                .is_ok();
        Self { file, held }
    }

    pub(super) fn exclusive(file: &'a File) -> Self {
        let held = FileExt::try_lock_exclusive(file).is_ok()
            || FileExt::lock_exclusive(file)
                .map_err(|e| debug!(error = %e, "Exclusive lock unavailable"))
                .is_ok();
        Self { file, held }
    }
}

impl Drop for FileLockGuard<'_> {
    fn drop(&mut self) {
        if self.held {
            let _ = FileExt::unlock(self.file);
        }
    }
}
