//! Create command implementation

use std::fs;

use anyhow::{Context, Result};
use cbox_core::{Error, RuntimeConfig, Tag};
use cbox_registry::Registry;
use cbox_rootfs::{BaseImageCache, Provisioner};
use tracing::{info, warn};

const TAG_EXISTS: &str = "Tag already exists";

pub fn execute(tag: Option<String>) -> Result<i32> {
    let tag = tag.map(Tag::new).transpose().context("Invalid tag")?;

    let config = RuntimeConfig::from_env().context("Failed to resolve configuration")?;

    // Held until the new entry is written
    let mut registry = Registry::open(&config).context("Failed to open registry")?;

    if let Some(tag) = &tag {
        if registry.contains(tag.as_str()) {
            println!("{TAG_EXISTS}");
            return Ok(0);
        }
    }

    let provisioner = Provisioner::new(BaseImageCache::new(config));
    let instance = provisioner
        .materialize()
        .context("Failed to provision container")?;
    println!("The new container is {}", instance.id());

    match registry.register(tag, &instance) {
        Ok(tag) => {
            info!(tag = %tag, path = %instance.path().display(), "Container created");
            Ok(0)
        }
        Err(Error::TagExists { .. }) => {
            // Generated id collided with a hand-picked tag
            println!("{TAG_EXISTS}");
            if let Err(e) = fs::remove_dir_all(instance.path()) {
                warn!(path = %instance.path().display(), "Failed to remove unregistered rootfs: {}", e);
            }
            Ok(0)
        }
        Err(e) => Err(e).context("Failed to register container"),
    }
}
