//! Hidden `child` command: the container session inside new namespaces

use std::path::Path;

use anyhow::{Context, Result};
use cbox_core::{PidsLimit, RuntimeConfig};

use super::split_command;
use crate::session::ContainerSession;

pub fn execute(rootfs: &Path, command: &[String], ephemeral: bool, privileged: bool) -> Result<i32> {
    let (program, args) = split_command(command)?;

    let max_pids = RuntimeConfig::from_env().map_or_else(|_| PidsLimit::default(), |c| c.max_pids);

    ContainerSession::new(rootfs, program, args.to_vec())
        .with_ephemeral(ephemeral)
        .with_privileged(privileged)
        .with_max_pids(max_pids)
        .run()
        .context("Container session failed")
}
