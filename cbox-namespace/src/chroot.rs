//! Reversible chroot
//!
//! Entering keeps open handles on the old root and working directory.
//! Restoring changes back into the old root, re-roots at `.` and returns
//! to the saved working directory. Until that happens the rootfs is the
//! process root and cannot be removed.

use std::fs::File;
use std::path::{Path, PathBuf};

use cbox_core::{Error, Result};
use nix::unistd::{chroot, fchdir};
use tracing::{debug, error, warn};

/// An active chroot into a container rootfs
#[derive(Debug)]
pub struct ChrootSession {
    target: PathBuf,
    saved: Option<SavedRoot>,
}

#[derive(Debug)]
struct SavedRoot {
    root: File,
    cwd: File,
}

impl ChrootSession {
    /// Change root to `path`
    ///
    /// On failure nothing has changed and the saved handles are closed.
    pub fn enter(path: impl AsRef<Path>) -> Result<Self> {
        let target = path.as_ref().to_path_buf();

        let root = open_dir(Path::new("/"))?;
        let cwd = open_dir(Path::new("."))?;

        chroot(target.as_path()).map_err(|e| Error::Chroot {
            message: format!("Failed to chroot into {}: {e}", target.display()),
        })?;

        debug!(path = %target.display(), "Entered chroot");

        Ok(Self {
            target,
            saved: Some(SavedRoot { root, cwd }),
        })
    }

    /// Directory this session is rooted in
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Leave the chroot
    ///
    /// Anything mounted inside the rootfs should be unmounted first.
    pub fn restore(mut self) -> Result<()> {
        self.restore_saved()
    }

    fn restore_saved(&mut self) -> Result<()> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };

        change_dir(&saved.root)?;
        chroot(".").map_err(|e| Error::Chroot {
            message: format!("Failed to restore original root: {e}"),
        })?;
        change_dir(&saved.cwd)?;

        debug!(path = %self.target.display(), "Left chroot");
        Ok(())
    }
}

impl Drop for ChrootSession {
    fn drop(&mut self) {
        if self.saved.is_some() {
            warn!(path = %self.target.display(), "Chroot dropped without restore, restoring now");
            if let Err(e) = self.restore_saved() {
                error!("Failed to restore root: {}", e);
            }
        }
    }
}

fn open_dir(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::Chroot {
        message: format!("Failed to open {}: {e}", path.display()),
    })
}

fn change_dir(dir: &File) -> Result<()> {
    fchdir(dir).map_err(|e| Error::Chroot {
        message: format!("fchdir failed: {e}"),
    })
}
