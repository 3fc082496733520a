//! Limit implementations
//!
//! Writes to the pids controller's control files.

use cbox_core::{PidsLimit, Result};
use tracing::debug;

use crate::controller::{CGroupController, CgroupVersion};

impl CGroupController {
    /// Set `pids.max` for this cgroup
    ///
    /// Once the group holds `limit` live processes, `fork` and `clone`
    /// inside it fail with `EAGAIN`.
    pub fn write_pids_max(&self, limit: PidsLimit) -> Result<()> {
        debug!("Setting pids limit to {}", limit);
        self.write_control("pids.max", &limit.to_string())
    }

    /// Remove the pids limit (set to "max")
    pub fn remove_pids_limit(&self) -> Result<()> {
        debug!("Removing pids limit");
        self.write_control("pids.max", "max")
    }

    /// Mark the group for removal once empty
    ///
    /// Only the v1 hierarchy has `notify_on_release`; on v2 this is a no-op.
    pub fn write_release_flag(&self) -> Result<()> {
        match self.version {
            CgroupVersion::V1 => self.write_control("notify_on_release", "1"),
            CgroupVersion::V2 => {
                debug!("notify_on_release not available on cgroup v2, skipping");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::confine;
    use cbox_core::ProcessId;
    use std::fs;

    #[test]
    fn test_pids_max_written() {
        let dir = tempfile::tempdir().unwrap();
        let controller = CGroupController::with_root(dir.path()).unwrap();

        controller.write_pids_max(PidsLimit::new(20)).unwrap();
        assert_eq!(
            fs::read_to_string(controller.path().join("pids.max")).unwrap(),
            "20"
        );

        controller.remove_pids_limit().unwrap();
        assert_eq!(
            fs::read_to_string(controller.path().join("pids.max")).unwrap(),
            "max"
        );
    }

    #[test]
    fn test_v1_confine_sets_release_flag() {
        let dir = tempfile::tempdir().unwrap();
        let controller = CGroupController::with_root(dir.path()).unwrap();

        confine(&controller, ProcessId::from_raw(99), PidsLimit::default()).unwrap();

        let group = controller.path();
        assert_eq!(fs::read_to_string(group.join("pids.max")).unwrap(), "20");
        assert_eq!(fs::read_to_string(group.join("notify_on_release")).unwrap(), "1");
        assert_eq!(fs::read_to_string(group.join("cgroup.procs")).unwrap(), "99");
    }

    #[test]
    fn test_v2_confine_has_no_release_flag() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cgroup.controllers"), "pids").unwrap();
        let controller = CGroupController::with_root(dir.path()).unwrap();

        confine(&controller, ProcessId::from_raw(99), PidsLimit::new(3)).unwrap();

        assert!(!controller.path().join("notify_on_release").exists());
        assert_eq!(
            fs::read_to_string(controller.path().join("pids.max")).unwrap(),
            "3"
        );
    }
}
