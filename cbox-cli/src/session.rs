//! Container session
//!
//! Runs inside the namespaces created by the launcher. The unwind is
//! ordered: `/proc` is unmounted before the chroot is left, and an
//! ephemeral rootfs is deleted only once the process is back at its
//! original root.

use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};
use cbox_cgroup::{CGroupController, confine};
use cbox_core::constants::CONTAINER_HOSTNAME;
use cbox_core::{ContainerEvent, PidsLimit, ProcessId};
use cbox_namespace::{ChrootSession, ProcMount, make_mounts_private};
use nix::unistd::sethostname;
use tracing::{debug, error, info};

/// Child-side orchestration of one container command
#[derive(Debug, Clone)]
pub struct ContainerSession {
    rootfs: PathBuf,
    command: String,
    args: Vec<String>,
    ephemeral: bool,
    privileged: bool,
    max_pids: PidsLimit,
}

impl ContainerSession {
    pub fn new(rootfs: impl Into<PathBuf>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            rootfs: rootfs.into(),
            command: command.into(),
            args,
            ephemeral: false,
            privileged: false,
            max_pids: PidsLimit::default(),
        }
    }

    #[must_use]
    pub const fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    #[must_use]
    pub const fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    #[must_use]
    pub const fn with_max_pids(mut self, max_pids: PidsLimit) -> Self {
        self.max_pids = max_pids;
        self
    }

    /// Run the command in the rootfs and return its exit code
    ///
    /// This will:
    /// 1. Set the hostname
    /// 2. Confine the process count (privileged only)
    /// 3. Enter the rootfs and mount `/proc`
    /// 4. Run the command
    /// 5. Unmount `/proc` and leave the rootfs
    /// 6. Delete the rootfs if ephemeral
    pub fn run(&self) -> Result<i32> {
        info!(rootfs = %self.rootfs.display(), command = %self.command, "Container session started");

        sethostname(CONTAINER_HOSTNAME).context("Failed to set hostname")?;

        if self.privileged {
            let controller = CGroupController::new().context("Failed to create cgroup")?;
            confine(&controller, ProcessId::current(), self.max_pids)
                .context("Failed to confine container")?;
        } else {
            debug!("Unprivileged, skipping cgroup confinement");
        }

        make_mounts_private()?;

        let chroot = ChrootSession::enter(&self.rootfs)
            .with_context(|| format!("Failed to enter {}", self.rootfs.display()))?;

        let outcome = self.run_rooted();
        let restored = chroot.restore().context("Failed to leave container root");

        if restored.is_ok() && self.ephemeral {
            remove_rootfs(&self.rootfs);
        }

        let code = outcome?;
        restored?;
        Ok(code)
    }

    /// Everything that happens with the rootfs as `/`
    fn run_rooted(&self) -> Result<i32> {
        std::env::set_current_dir("/").context("Failed to change directory to /")?;

        let proc = ProcMount::mount("/proc")?;
        let status = self.run_command();
        let unmounted = proc.unmount();

        let code = status?;
        unmounted?;
        Ok(code)
    }

    fn run_command(&self) -> Result<i32> {
        debug!("Executing: {} {:?}", self.command, self.args);

        let status = Command::new(&self.command)
            .args(&self.args)
            .status()
            .with_context(|| format!("Failed to execute {}", self.command))?;

        let code = exit_code(status);
        info!("Command exited with code: {}", code);
        Ok(code)
    }
}

/// Exit code, or 128 + signal number
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

fn remove_rootfs(rootfs: &Path) {
    match fs::remove_dir_all(rootfs) {
        Ok(()) => ContainerEvent::removed(rootfs.to_path_buf()).emit_trace(),
        Err(e) => error!(path = %rootfs.display(), "Failed to remove ephemeral rootfs: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_from_status() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        // Killed by SIGKILL
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }

    #[test]
    fn test_session_defaults() {
        let session = ContainerSession::new("/tmp/rootfs", "echo", vec!["hi".to_string()]);

        assert!(!session.ephemeral);
        assert!(!session.privileged);
        assert_eq!(session.max_pids, PidsLimit::default());
    }

    #[test]
    fn test_remove_rootfs() {
        let dir = tempfile::tempdir().unwrap();
        let rootfs = dir.path().join("rootfs");
        fs::create_dir_all(rootfs.join("proc")).unwrap();

        remove_rootfs(&rootfs);
        assert!(!rootfs.exists());
    }
}
