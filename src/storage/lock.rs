//! # Sidecar Writer Lock
//!
//! Single-writer enforcement is advisory: a non-blocking exclusive
//! `flock` on a sidecar `<store>.lock` file. The sidecar is created on
//! demand; its existence alone means nothing, only the advisory lock
//! does, so stale files left by crashed processes never wedge a store
//! (the kernel drops the lock with the process).
//!
//! Read-only opens never touch the sidecar.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{Result, StoreError};

/// An acquired exclusive writer lock.
///
/// Held for the owning store's lifetime; released explicitly on store
/// close, or by the OS when the file handle drops.
#[derive(Debug)]
pub struct WriterLock {
    file: File,
    path: PathBuf,
}

impl WriterLock {
    /// Acquires the exclusive lock for the store at `store_path`,
    /// creating `<store_path>.lock` if needed.
    ///
    /// Non-blocking: contention fails immediately with
    /// [`StoreError::Locked`] and no side effects beyond the sidecar
    /// file's existence.
    pub fn acquire(store_path: &Path) -> Result<WriterLock> {
        let path = sidecar_path(store_path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::io(format!("create lock file {}", path.display()), e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "acquired writer lock");
                Ok(WriterLock { file, path })
            }
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(StoreError::Locked { path })
            }
            Err(e) => Err(StoreError::io(format!("lock {}", path.display()), e)),
        }
    }

    /// Releases the lock. Dropping the handle releases it too; the
    /// explicit form surfaces unlock errors on store close.
    pub fn release(self) -> Result<()> {
        FileExt::unlock(&self.file)
            .map_err(|e| StoreError::io(format!("unlock {}", self.path.display()), e))
    }
}

/// `<store_path>.lock`
fn sidecar_path(store_path: &Path) -> PathBuf {
    let mut os = store_path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_file_uses_the_sidecar_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/data/metrics.mmfg")),
            Path::new("/data/metrics.mmfg.lock")
        );
    }

    #[test]
    fn second_acquisition_fails_with_locked() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.bin");

        let held = WriterLock::acquire(&store_path).unwrap();
        let err = WriterLock::acquire(&store_path).unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }));

        held.release().unwrap();
    }

    #[test]
    fn release_makes_the_lock_acquirable_again() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.bin");

        let first = WriterLock::acquire(&store_path).unwrap();
        first.release().unwrap();

        let second = WriterLock::acquire(&store_path).unwrap();
        second.release().unwrap();
    }

    #[test]
    fn a_preexisting_sidecar_file_is_not_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.bin");
        std::fs::write(sidecar_path(&store_path), b"stale").unwrap();

        let lock = WriterLock::acquire(&store_path).unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn dropping_the_lock_releases_it() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.bin");

        drop(WriterLock::acquire(&store_path).unwrap());
        let reacquired = WriterLock::acquire(&store_path).unwrap();
        reacquired.release().unwrap();
    }
}
