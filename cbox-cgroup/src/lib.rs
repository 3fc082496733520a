//! `CGroup` process-count confinement
//!
//! This crate creates a `pids` group for cbox, caps the number of live
//! processes in it, and moves a process into it. Both the unified (v2) and
//! legacy (v1) hierarchies are supported.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod controller;
pub mod limits;

pub use backend::{ConfinementBackend, MockBackend, MockCall, confine};
pub use controller::{CGroupController, CgroupVersion};

// Re-export commonly used types
pub use cbox_core::{PidsLimit, ProcessId};

/// Mount point of the cgroup filesystem
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Name of the group cbox creates
pub const CBOX_GROUP: &str = "cbox";
