//! Delete command implementation

use anyhow::{Context, Result};
use cbox_core::RuntimeConfig;
use cbox_registry::{Registry, RemovalReport};

pub fn execute(tags: &[String]) -> Result<i32> {
    let config = RuntimeConfig::from_env().context("Failed to resolve configuration")?;
    let mut registry = Registry::open(&config).context("Failed to open registry")?;

    let mut report = RemovalReport::default();
    let result = registry.remove_into(tags, &mut report);

    // Tags handled before a failure are reported either way
    print!("{}", render_report(tags, &report, result.is_ok()));
    result.context("Failed to delete container")?;
    Ok(0)
}

/// One line per handled tag, in request order
fn render_report(tags: &[String], report: &RemovalReport, complete: bool) -> String {
    let mut out = String::new();
    for tag in tags {
        if report.removed.contains(tag) {
            out.push_str(&format!("Deleted {tag}\n"));
        } else if report.not_found.contains(tag) {
            out.push_str(&format!("A container with the name {tag} does not exist\n"));
        }
    }
    if complete {
        out.push_str("Successfully deleted container(s)\n");
    }
    out
}
