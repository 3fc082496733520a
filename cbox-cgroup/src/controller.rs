//! CGroup controller implementation

use std::fs;
use std::path::{Path, PathBuf};

use cbox_core::{Error, ProcessId, Result};
use tracing::debug;

use crate::backend::ConfinementBackend;

/// Which cgroup hierarchy is mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    /// Legacy per-controller hierarchies (`<root>/pids/...`)
    V1,
    /// Unified hierarchy (`<root>/...`)
    V2,
}

impl CgroupVersion {
    /// Detect the hierarchy mounted at `root`
    #[must_use]
    pub fn detect(root: &Path) -> Self {
        if root.join("cgroup.controllers").exists() {
            Self::V2
        } else {
            Self::V1
        }
    }
}

/// The cbox `pids` group
///
/// This struct represents a group in the filesystem hierarchy:
/// - v2: `/sys/fs/cgroup/cbox`
/// - v1: `/sys/fs/cgroup/pids/cbox`
#[derive(Debug)]
pub struct CGroupController {
    /// Full path to this group directory
    pub(crate) path: PathBuf,

    /// Hierarchy the group lives in
    pub(crate) version: CgroupVersion,
}

impl CGroupController {
    /// Open or create the cbox group under the system cgroup mount
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Not running as root
    /// - Directory creation fails
    pub fn new() -> Result<Self> {
        if !nix::unistd::geteuid().is_root() {
            return Err(Error::PermissionDenied {
                operation: "create cgroup (requires root)".to_string(),
            });
        }
        Self::with_root(crate::CGROUP_ROOT)
    }

    /// Open or create the cbox group under `root`
    pub fn with_root(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let version = CgroupVersion::detect(root);

        let path = match version {
            CgroupVersion::V2 => root.join(crate::CBOX_GROUP),
            CgroupVersion::V1 => root.join("pids").join(crate::CBOX_GROUP),
        };

        debug!(path = %path.display(), ?version, "Opening cgroup");

        if version == CgroupVersion::V2 {
            Self::enable_pids_controller(root);
        }

        if !path.exists() {
            debug!("Creating cgroup directory: {}", path.display());
            fs::create_dir_all(&path).map_err(|e| Error::Confinement {
                message: format!("Failed to create cgroup directory {}: {e}", path.display()),
            })?;
        }

        Ok(Self { path, version })
    }

    /// Group directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hierarchy in use
    #[must_use]
    pub const fn version(&self) -> CgroupVersion {
        self.version
    }

    /// Enable the pids controller for children of `root`
    fn enable_pids_controller(root: &Path) {
        let control_file = root.join("cgroup.subtree_control");

        let current = fs::read_to_string(&control_file).unwrap_or_default();
        if current.split_whitespace().any(|c| c == "pids") {
            debug!("pids controller already enabled at {}", root.display());
            return;
        }

        // Systemd usually manages this already; failure is not fatal
        if let Err(e) = fs::write(&control_file, "+pids") {
            debug!(
                "Could not enable pids controller in {} (may be OK): {}",
                root.display(),
                e
            );
        }
    }

    pub(crate) fn write_control(&self, file: &str, value: &str) -> Result<()> {
        let target = self.path.join(file);
        fs::write(&target, value).map_err(|e| Error::Confinement {
            message: format!("Failed to write {value:?} to {}: {e}", target.display()),
        })
    }
}

impl ConfinementBackend for CGroupController {
    fn set_pids_limit(&self, limit: cbox_core::PidsLimit) -> Result<()> {
        self.write_pids_max(limit)
    }

    fn release_when_empty(&self) -> Result<()> {
        self.write_release_flag()
    }

    fn add_process(&self, pid: ProcessId) -> Result<()> {
        debug!("Adding process {} to cgroup", pid);
        self.write_control("cgroup.procs", &pid.as_raw().to_string())
    }
}
