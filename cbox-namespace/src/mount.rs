//! Mount helpers for the container's mount namespace

use std::fs;
use std::path::{Path, PathBuf};

use cbox_core::{Error, Result};
use nix::mount::{MntFlags, MsFlags, mount, umount, umount2};
use tracing::{debug, error, warn};

/// Stop mount events propagating back to the host
///
/// A new mount namespace starts as a copy of the parent's, which on most
/// systems is shared. Mark everything private before mounting anything.
pub fn make_mounts_private() -> Result<()> {
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| Error::Mount {
        message: format!("Failed to make / private: {e}"),
    })?;

    debug!("Mount tree made private");
    Ok(())
}

/// A mounted `proc` filesystem
///
/// Unmounted by [`ProcMount::unmount`], or lazily on drop.
#[derive(Debug)]
pub struct ProcMount {
    target: PathBuf,
    mounted: bool,
}

impl ProcMount {
    /// Mount `proc` at `target`, creating the directory if needed
    pub fn mount(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();

        if !target.exists() {
            fs::create_dir_all(&target).map_err(|e| Error::Mount {
                message: format!("Failed to create {}: {e}", target.display()),
            })?;
        }

        // MS_NOSUID | MS_NODEV | MS_NOEXEC for security
        let flags = MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC;

        mount(Some("proc"), target.as_path(), Some("proc"), flags, None::<&str>).map_err(
            |e| Error::Mount {
                message: format!("Failed to mount proc at {}: {e}", target.display()),
            },
        )?;

        debug!(target = %target.display(), "Mounted proc");
        Ok(Self {
            target,
            mounted: true,
        })
    }

    /// Mount point
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Unmount now
    ///
    /// A failed unmount is still reported, and the mount is then detached
    /// lazily on drop.
    pub fn unmount(mut self) -> Result<()> {
        umount(self.target.as_path()).map_err(|e| Error::Mount {
            message: format!("Failed to unmount {}: {e}", self.target.display()),
        })?;
        self.mounted = false;

        debug!(target = %self.target.display(), "Unmounted proc");
        Ok(())
    }
}

impl Drop for ProcMount {
    fn drop(&mut self) {
        if self.mounted {
            warn!(target = %self.target.display(), "proc still mounted, detaching");
            if let Err(e) = umount2(self.target.as_path(), MntFlags::MNT_DETACH) {
                error!("Failed to detach {}: {}", self.target.display(), e);
            }
        }
    }
}
