//! Run command implementation

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cbox_core::RuntimeConfig;
use cbox_namespace::{ChildInvocation, is_privileged};
use cbox_rootfs::{BaseImageCache, Provisioner};
use tracing::{error, warn};

use super::{launch, split_command};

pub fn execute(command: &[String], verbose: bool) -> Result<i32> {
    let (program, args) = split_command(command)?;

    let config = RuntimeConfig::from_env().context("Failed to resolve configuration")?;
    let provisioner = Provisioner::new(BaseImageCache::new(config));

    let instance = provisioner
        .materialize()
        .context("Failed to provision container")?;
    println!("The new container is {}", instance.id());

    let rootfs = instance.into_path();
    let invocation = ChildInvocation::new(&rootfs, program, args.to_vec())
        .with_ephemeral(true)
        .with_privileged(is_privileged())
        .with_verbose(verbose);

    let result = launch(provisioner.cache(), &invocation);

    remove_leftover(&rootfs);

    let code = result?;
    println!("Contained");
    Ok(code)
}

/// Delete an ephemeral rootfs the child did not get to remove
fn remove_leftover(rootfs: &Path) {
    if !rootfs.exists() {
        return;
    }

    warn!(path = %rootfs.display(), "Ephemeral rootfs still present, removing");
    if let Err(e) = fs::remove_dir_all(rootfs) {
        error!(path = %rootfs.display(), "Failed to remove ephemeral rootfs: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_leftover() {
        let dir = tempfile::tempdir().unwrap();
        let rootfs = dir.path().join("abcd1234");
        fs::create_dir_all(rootfs.join("bin")).unwrap();

        remove_leftover(&rootfs);
        assert!(!rootfs.exists());

        // Already gone is fine
        remove_leftover(&rootfs);
    }
}
