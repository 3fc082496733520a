//! List command implementation

use anyhow::{Context, Result};
use cbox_core::RuntimeConfig;
use cbox_registry::Registry;

pub fn execute() -> Result<i32> {
    let config = RuntimeConfig::from_env().context("Failed to resolve configuration")?;
    let registry = Registry::open(&config).context("Failed to open registry")?;

    println!("Containers in storage:");
    println!("--------");
    for tag in registry.list() {
        println!("{tag}");
    }
    println!("--------");

    Ok(0)
}
