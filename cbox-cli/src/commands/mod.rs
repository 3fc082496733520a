use anyhow::{Context, Result};
use cbox_core::ContainerEvent;
use cbox_namespace::{ChildInvocation, Launcher};
use cbox_rootfs::BaseImageCache;

use crate::cli::Commands;

pub mod child;
pub mod create;
pub mod delete;
pub mod list;
pub mod run;
pub mod start;

/// Dispatch command to appropriate handler
///
/// Returns the exit code for the process.
pub fn dispatch(command: Commands, verbose: bool) -> Result<i32> {
    match command {
        Commands::Run { command } => run::execute(&command, verbose),

        Commands::Create { tag } => create::execute(tag),

        Commands::Start { tag, command } => start::execute(&tag, &command, verbose),

        Commands::Delete { tags } => delete::execute(&tags),

        Commands::List => list::execute(),

        Commands::Child {
            ephemeral,
            privileged,
            rootfs,
            command,
        } => child::execute(&rootfs, &command, ephemeral, privileged),
    }
}

/// Split `[program, args...]`
pub(crate) fn split_command(command: &[String]) -> Result<(&str, &[String])> {
    command
        .split_first()
        .map(|(program, args)| (program.as_str(), args))
        .context("No command given")
}

/// Ensure the base image, then run `invocation` in new namespaces
///
/// The image is checked again here because `start` may run long after
/// the container was created.
pub(crate) fn launch(cache: &BaseImageCache, invocation: &ChildInvocation) -> Result<i32> {
    cache
        .ensure_cached()
        .context("Failed to fetch base image")?;

    let mut command = vec![invocation.command.clone()];
    command.extend(invocation.args.iter().cloned());
    ContainerEvent::started(invocation.rootfs.clone(), command, invocation.ephemeral).emit_trace();

    let code = Launcher::for_invocation(invocation)
        .launch(invocation)
        .context("Failed to launch container")?;

    ContainerEvent::exited(invocation.rootfs.clone(), code).emit_trace();
    Ok(code)
}
