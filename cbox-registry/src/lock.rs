//! Advisory lock over the registry file

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use cbox_core::{Error, Result};
use nix::fcntl::{Flock, FlockArg};
use tracing::trace;

/// Exclusive `flock(2)` held until dropped
pub struct RegistryLock {
    path: PathBuf,
    _lock: Flock<File>,
}

impl RegistryLock {
    /// Block until the exclusive lock on `path` is acquired
    ///
    /// The lock file is created if missing and never removed.
    pub fn acquire(path: &Path) -> Result<Self> {
        trace!(lock = %path.display(), "Acquiring registry lock");

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::Registry {
                path: path.to_path_buf(),
                message: format!("open lock file: {e}"),
            })?;

        let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, e)| Error::Registry {
            path: path.to_path_buf(),
            message: format!("acquire lock: {e}"),
        })?;

        trace!(lock = %path.display(), "Acquired registry lock");
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    /// Try once without blocking; `Ok(None)` when another holder exists
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::Registry {
                path: path.to_path_buf(),
                message: format!("open lock file: {e}"),
            })?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(Self {
                path: path.to_path_buf(),
                _lock: lock,
            })),
            Err((_, nix::errno::Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, e)) => Err(Error::Registry {
                path: path.to_path_buf(),
                message: format!("acquire lock: {e}"),
            }),
        }
    }
}

impl std::fmt::Debug for RegistryLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        trace!(lock = %self.path.display(), "Releasing registry lock");
    }
}
