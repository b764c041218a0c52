//! flock(2)-based locks guarding provisioning runs and audit appends.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Exclusive lock held until drop.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("open lock file {}", path.display()))
}

fn is_contended(err: &io::Error) -> bool {
    // fs2 may surface EAGAIN as Other rather than WouldBlock.
    err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(11)
}

impl FileLock {
    /// Block until the lock is ours.
    pub fn exclusive(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()
            .with_context(|| format!("acquire lock {}", path.display()))?;
        Ok(Self { _file: file })
    }

    /// `Ok(None)` when another process holds the lock.
    pub fn try_exclusive(path: &Path) -> Result<Option<Self>> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { _file: file })),
            Err(ref e) if is_contended(e) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("try lock {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_provision_lock_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("provision.lock");
        let first = FileLock::try_exclusive(&path).unwrap();
        assert!(first.is_some());
        assert!(FileLock::try_exclusive(&path).unwrap().is_none());
    }

    #[test]
    fn test_lock_free_after_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.lock");
        drop(FileLock::exclusive(&path).unwrap());
        assert!(FileLock::try_exclusive(&path).unwrap().is_some());
    }
}
