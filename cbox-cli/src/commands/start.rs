//! Start command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use cbox_core::RuntimeConfig;
use cbox_namespace::{ChildInvocation, is_privileged};
use cbox_registry::Registry;
use cbox_rootfs::BaseImageCache;

use super::{launch, split_command};

pub fn execute(tag: &str, command: &[String], verbose: bool) -> Result<i32> {
    let (program, args) = split_command(command)?;

    let config = RuntimeConfig::from_env().context("Failed to resolve configuration")?;
    let rootfs = resolve(&config, tag)?;

    tracing::info!(tag, rootfs = %rootfs.display(), "Starting container");

    let invocation = ChildInvocation::new(rootfs, program, args.to_vec())
        .with_privileged(is_privileged())
        .with_verbose(verbose);

    launch(&BaseImageCache::new(config), &invocation)
}

/// Look up the rootfs for `tag`, releasing the registry lock before launch
fn resolve(config: &RuntimeConfig, tag: &str) -> Result<PathBuf> {
    let registry = Registry::open(config).context("Failed to open registry")?;
    Ok(registry.resolve(tag)?.to_path_buf())
}
