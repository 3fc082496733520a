//! cbox container runtime CLI
//!
//! A minimal single-host container runtime built on Linux namespaces,
//! chroot and the cgroup pids controller.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod session;

use cli::Cli;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Execute the command
    match commands::dispatch(cli.command, cli.verbose) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

/// Log to stderr; stdout belongs to the container
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
