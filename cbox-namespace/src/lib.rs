//! Namespace management for process isolation
//!
//! This crate provides the Linux isolation primitives cbox builds on:
//! - UTS, PID and mount namespaces, plus a user namespace when unprivileged
//! - UID/GID mapping for the user namespace
//! - A reversible chroot
//! - A `/proc` mount guard
//! - The launcher that re-executes cbox inside fresh namespaces

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod chroot;
pub mod config;
pub mod idmap;
pub mod launcher;
pub mod mount;

pub use chroot::ChrootSession;
pub use config::NamespaceConfig;
pub use idmap::IdMapping;
pub use launcher::{ChildInvocation, Launcher};
pub use mount::{ProcMount, make_mounts_private};

/// Whether this process holds host root
///
/// Privileged launches skip the user namespace and apply cgroup
/// confinement; unprivileged ones map the invoking user to root instead.
#[must_use]
pub fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}
