//! UID/GID mapping for user namespaces

use std::fs;
use std::path::{Path, PathBuf};

use cbox_core::{Error, ProcessId, Result};
use tracing::debug;

/// Single-entry mapping of a host user to root inside the namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    /// Host UID seen as 0 inside the namespace
    pub host_uid: u32,

    /// Host GID seen as 0 inside the namespace
    pub host_gid: u32,
}

impl IdMapping {
    /// Map the invoking user and group
    #[must_use]
    pub fn current_user() -> Self {
        Self {
            host_uid: nix::unistd::getuid().as_raw(),
            host_gid: nix::unistd::getgid().as_raw(),
        }
    }

    /// Contents of `uid_map`
    #[must_use]
    pub fn uid_map_line(&self) -> String {
        format!("0 {} 1\n", self.host_uid)
    }

    /// Contents of `gid_map`
    #[must_use]
    pub fn gid_map_line(&self) -> String {
        format!("0 {} 1\n", self.host_gid)
    }

    /// Write the mapping for a freshly cloned process
    pub fn write_for(&self, pid: ProcessId) -> Result<()> {
        self.write_to(&PathBuf::from(format!("/proc/{pid}")))
    }

    /// Write the mapping into a `/proc/<pid>` style directory
    ///
    /// `setgroups` must be denied before an unprivileged writer may
    /// set `gid_map`; kernels without the file skip that step.
    pub fn write_to(&self, proc_dir: &Path) -> Result<()> {
        let setgroups = proc_dir.join("setgroups");
        if setgroups.exists() {
            write_map(&setgroups, "deny")?;
        }

        write_map(&proc_dir.join("uid_map"), &self.uid_map_line())?;
        write_map(&proc_dir.join("gid_map"), &self.gid_map_line())?;

        debug!(
            proc_dir = %proc_dir.display(),
            host_uid = self.host_uid,
            host_gid = self.host_gid,
            "Wrote UID/GID map"
        );
        Ok(())
    }
}

fn write_map(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| Error::Namespace {
        message: format!("Failed to write {}: {e}", path.display()),
    })
}
